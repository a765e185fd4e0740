use crate::params::ModelParameters;
use kill_criteria::KillCheck;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thesis_core::{
    ClaimMap, ClaimSource, DollarRange, Expectation, ExpectationResult, FinancialClaim,
    KillCriterion, ThesisImpact,
};

fn round0(x: f64) -> f64 {
    x.round()
}

fn round_dp(x: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (x * factor).round() / factor
}

/// Composite view of how a funding gap could be covered. Each field is
/// present only when its inputs exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingGapCoverage {
    pub gap_low: f64,
    pub gap_high: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_facility_available: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_covers_gap_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_interest_expense: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_interest_rate_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_maturity: Option<f64>,
}

/// Snapshot of every model output, for display and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub revenue: Option<f64>,
    pub hedged_revenue: Option<f64>,
    pub unhedged_volume: Option<f64>,
    pub unhedged_revenue: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub funding_gap: Option<DollarRange>,
    pub free_cash_flow: Option<DollarRange>,
    pub breakeven_price: Option<f64>,
    pub hedge_coverage_pct: Option<f64>,
    pub capex_change_pct: Option<f64>,
    pub production_change_pct: Option<f64>,
    pub forward_curve_upside: Option<f64>,
    pub net_debt_to_ocf: Option<f64>,
    pub ocf_coverage_pct: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub debt_service_capacity: Option<f64>,
    pub funding_gap_coverage: Option<FundingGapCoverage>,
}

/// Simple E&P financial model. Rough but explicit.
///
/// Stateless over a [`ModelParameters`] snapshot. Unit contract throughout:
/// production in Bcf, price in $/Mcf, so their product is already $M
/// (10^9 cf * $/10^3 cf = 10^6 $), so no extra scaling is needed.
pub struct FinancialModel {
    params: ModelParameters,
}

impl FinancialModel {
    pub fn new(params: ModelParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    fn capex_low(&self) -> Option<f64> {
        self.params.capex_low
    }

    fn capex_high(&self) -> Option<f64> {
        self.params.capex_high.or(self.params.capex_low)
    }

    fn capex_mid(&self) -> Option<f64> {
        match (self.capex_low(), self.capex_high()) {
            (Some(low), Some(high)) => Some((low + high) / 2.0),
            (low, high) => low.or(high),
        }
    }

    /// production (Bcf) * realized_price ($/Mcf) = $M.
    pub fn revenue(&self) -> Option<f64> {
        let prod = self.params.production_volume?;
        let price = self.params.realized_price?;
        Some(round0(prod * price))
    }

    /// hedge_volume (Bcf) * hedge_price ($/Mcf) = $M.
    pub fn hedged_revenue(&self) -> Option<f64> {
        let vol = self.params.hedge_volume?;
        let price = self.params.hedge_price?;
        Some(round0(vol * price))
    }

    /// production - hedge_volume (Bcf).
    pub fn unhedged_volume(&self) -> Option<f64> {
        let prod = self.params.production_volume?;
        let hedge = self.params.hedge_volume?;
        Some(round_dp(prod - hedge, 1))
    }

    /// Unhedged volume times `price`, defaulting to the forward curve and
    /// then the realized price.
    pub fn unhedged_revenue(&self, price: Option<f64>) -> Option<f64> {
        let vol = self.unhedged_volume()?;
        let price = price
            .or(self.params.forward_curve_price)
            .or(self.params.realized_price)?;
        Some(round0(vol * price))
    }

    /// Reported OCF when available, else revenue - round(production * opex).
    pub fn operating_cash_flow(&self) -> Option<f64> {
        if let Some(ocf) = self.params.operating_cash_flow {
            return Some(ocf);
        }
        let rev = self.revenue()?;
        let prod = self.params.production_volume?;
        let opex = self.params.operating_cost_per_unit?;
        Some(rev - round0(prod * opex))
    }

    /// capex - OCF, re-sorted so low <= high regardless of sign.
    pub fn funding_gap(&self) -> Option<DollarRange> {
        let ocf = self.operating_cash_flow()?;
        let capex_low = self.capex_low()?;
        let capex_high = self.capex_high().unwrap_or(capex_low);
        let gap_low = round0(capex_low - ocf);
        let gap_high = round0(capex_high - ocf);
        Some(DollarRange {
            low: gap_low.min(gap_high),
            high: gap_low.max(gap_high),
        })
    }

    /// OCF - capex, sign-inverted funding gap.
    pub fn free_cash_flow(&self) -> Option<DollarRange> {
        let gap = self.funding_gap()?;
        Some(DollarRange {
            low: -gap.high,
            high: -gap.low,
        })
    }

    /// Realized price at which OCF would exactly cover the capex midpoint:
    /// capex_mid * realized_price / OCF. Requires OCF > 0.
    pub fn breakeven_price(&self) -> Option<f64> {
        let capex_mid = self.capex_mid()?;
        let ocf = self.operating_cash_flow()?;
        let realized = self.params.realized_price?;
        if ocf <= 0.0 {
            return None;
        }
        Some(round_dp(capex_mid * realized / ocf, 2))
    }

    /// hedge_volume / production * 100.
    pub fn hedge_coverage_pct(&self) -> Option<f64> {
        let hedge = self.params.hedge_volume?;
        let prod = self.params.production_volume?;
        if prod <= 0.0 {
            return None;
        }
        Some(round_dp(hedge / prod * 100.0, 1))
    }

    /// (capex_mid - prior_capex) / prior_capex * 100.
    pub fn capex_change_pct(&self) -> Option<f64> {
        let capex_mid = self.capex_mid()?;
        let prior = self.params.prior_capex?;
        if prior <= 0.0 {
            return None;
        }
        Some(round_dp((capex_mid - prior) / prior * 100.0, 1))
    }

    /// (production - prior_production) / prior_production * 100.
    pub fn production_change_pct(&self) -> Option<f64> {
        let prod = self.params.production_volume?;
        let prior = self.params.prior_production?;
        if prior <= 0.0 {
            return None;
        }
        Some(round_dp((prod - prior) / prior * 100.0, 1))
    }

    /// (forward_curve_price - realized_price) * unhedged_volume = $M.
    pub fn forward_curve_upside(&self) -> Option<f64> {
        let fwd = self.params.forward_curve_price?;
        let realized = self.params.realized_price?;
        let vol = self.unhedged_volume()?;
        Some(round0((fwd - realized) * vol))
    }

    /// Net debt / OCF: turns of OCF to repay debt. Requires OCF > 0.
    pub fn net_debt_to_ocf(&self) -> Option<f64> {
        let nd = self.params.net_debt?;
        let ocf = self.operating_cash_flow()?;
        if ocf <= 0.0 {
            return None;
        }
        Some(round_dp(nd / ocf, 1))
    }

    /// OCF / annual interest expense.
    pub fn interest_coverage(&self) -> Option<f64> {
        let ocf = self.operating_cash_flow()?;
        let interest = self.params.interest_expense?;
        if interest <= 0.0 {
            return None;
        }
        Some(round_dp(ocf / interest, 1))
    }

    /// (OCF - maintenance capex) / interest expense. Maintenance capex
    /// defaults to 40% of midpoint capex when not provided, a stated
    /// policy default, not a measured value.
    pub fn debt_service_capacity(&self) -> Option<f64> {
        let ocf = self.operating_cash_flow()?;
        let interest = self.params.interest_expense?;
        if interest <= 0.0 {
            return None;
        }
        let maint = match self.params.maintenance_capex {
            Some(m) => m,
            None => self.capex_mid()? * 0.4,
        };
        Some(round_dp((ocf - maint) / interest, 1))
    }

    /// OCF / capex midpoint * 100: how much of capex is internally funded.
    pub fn ocf_coverage_pct(&self) -> Option<f64> {
        let ocf = self.operating_cash_flow()?;
        let capex_mid = self.capex_mid()?;
        if capex_mid <= 0.0 {
            return None;
        }
        Some(round_dp(ocf / capex_mid * 100.0, 1))
    }

    /// How the funding gap could be covered. None when there is no gap.
    pub fn funding_gap_coverage(&self) -> Option<FundingGapCoverage> {
        let gap = self.funding_gap()?;
        if gap.high <= 0.0 {
            return None;
        }

        let facility = self.params.credit_facility_available;
        let facility_pct = facility.map(|f| round_dp(f / gap.high * 100.0, 1));

        let interest = self.params.interest_expense;
        let implied_rate = interest.and_then(|i| {
            let total_debt = self
                .params
                .total_long_term_debt
                .or(self.params.net_debt)
                .filter(|d| *d > 0.0)?;
            Some(round_dp(i / total_debt * 100.0, 1))
        });

        Some(FundingGapCoverage {
            gap_low: gap.low,
            gap_high: gap.high,
            credit_facility_available: facility,
            facility_covers_gap_pct: facility_pct,
            annual_interest_expense: interest,
            implied_interest_rate_pct: implied_rate,
            next_maturity: self.params.debt_maturity_next,
        })
    }

    /// All computed values in one struct for display/logging.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            revenue: self.revenue(),
            hedged_revenue: self.hedged_revenue(),
            unhedged_volume: self.unhedged_volume(),
            unhedged_revenue: self.unhedged_revenue(None),
            operating_cash_flow: self.operating_cash_flow(),
            funding_gap: self.funding_gap(),
            free_cash_flow: self.free_cash_flow(),
            breakeven_price: self.breakeven_price(),
            hedge_coverage_pct: self.hedge_coverage_pct(),
            capex_change_pct: self.capex_change_pct(),
            production_change_pct: self.production_change_pct(),
            forward_curve_upside: self.forward_curve_upside(),
            net_debt_to_ocf: self.net_debt_to_ocf(),
            ocf_coverage_pct: self.ocf_coverage_pct(),
            interest_coverage: self.interest_coverage(),
            debt_service_capacity: self.debt_service_capacity(),
            funding_gap_coverage: self.funding_gap_coverage(),
        }
    }

    /// Enrich the claim map with derived metrics. Idempotent: a second pass
    /// over the same map adds nothing new. Only keys tagged
    /// `source = derived` are ever written; a claim already present with a
    /// different source is left alone.
    pub fn compute_derived_claims(&self, claims: &mut ClaimMap) {
        if claims.is_empty() {
            return;
        }

        let writable = |claims: &ClaimMap, key: &str| {
            claims
                .get(key)
                .map(|c| c.source == ClaimSource::Derived)
                .unwrap_or(true)
        };

        if let Some(gap) = self.funding_gap() {
            if writable(claims, "funding_gap") {
                claims.insert(
                    "funding_gap".to_string(),
                    FinancialClaim::range(gap.low, gap.high, "M", ClaimSource::Derived)
                        .with_basis("capex_guidance minus operating_cash_flow"),
                );
            }
        }

        if let Some(pct) = self.capex_change_pct() {
            if writable(claims, "capex_increase_pct") {
                let prior = self.params.prior_capex.unwrap_or_default();
                claims.insert(
                    "capex_increase_pct".to_string(),
                    FinancialClaim::point(pct, "%", ClaimSource::Derived)
                        .with_basis(&format!("{prior}M (prior period)")),
                );
            }
        }

        if let Some(coverage) = self.hedge_coverage_pct() {
            if writable(claims, "hedge_coverage_pct") {
                claims.insert(
                    "hedge_coverage_pct".to_string(),
                    FinancialClaim::point(coverage, "%", ClaimSource::Derived),
                );
            }
        }

        if let Some(brk) = self.breakeven_price() {
            if writable(claims, "breakeven_price") {
                let unit = self
                    .params
                    .price_unit
                    .clone()
                    .unwrap_or_else(|| "$/Mcfe".to_string());
                claims.insert(
                    "breakeven_price".to_string(),
                    FinancialClaim::point(brk, &unit, ClaimSource::Derived)
                        .with_basis("self-funding at capex guidance"),
                );
            }
        }

        if let Some(leverage) = self.net_debt_to_ocf() {
            if writable(claims, "net_debt_to_ocf") {
                claims.insert(
                    "net_debt_to_ocf".to_string(),
                    FinancialClaim::point(leverage, "x", ClaimSource::Derived)
                        .with_basis("net_debt / operating_cash_flow"),
                );
            }
        }

        if let Some(coverage) = self.ocf_coverage_pct() {
            if writable(claims, "ocf_coverage_pct") {
                claims.insert(
                    "ocf_coverage_pct".to_string(),
                    FinancialClaim::point(coverage, "%", ClaimSource::Derived)
                        .with_basis("operating_cash_flow / capex_midpoint"),
                );
            }
        }

        if let Some(ic) = self.interest_coverage() {
            if writable(claims, "interest_coverage") {
                claims.insert(
                    "interest_coverage".to_string(),
                    FinancialClaim::point(ic, "x", ClaimSource::Derived)
                        .with_basis("operating_cash_flow / interest_expense"),
                );
            }
        }

        if let Some(dsc) = self.debt_service_capacity() {
            if writable(claims, "debt_service_capacity") {
                claims.insert(
                    "debt_service_capacity".to_string(),
                    FinancialClaim::point(dsc, "x", ClaimSource::Derived)
                        .with_basis("(OCF - maintenance_capex) / interest_expense"),
                );
            }
        }

        if let Some(fgc) = self.funding_gap_coverage() {
            if writable(claims, "funding_gap_coverage") {
                let mut claim = FinancialClaim {
                    value: None,
                    low: None,
                    high: None,
                    price: None,
                    unit: Some("composite".to_string()),
                    period: None,
                    basis: None,
                    source: ClaimSource::Derived,
                    detail: None,
                };
                if let Ok(detail) = serde_json::to_value(&fgc) {
                    claim.detail = Some(detail);
                }
                claims.insert("funding_gap_coverage".to_string(), claim);
            }
        }
    }

    /// Quantitative expectations for the next earnings period, prorated
    /// quarterly from annual claims with fixed policies. The ranges here are
    /// a published contract; actuals are scored against them verbatim.
    pub fn generate_expectations(&self, period: &str) -> Vec<Expectation> {
        let mut expectations = Vec::new();

        // Revenue: realized price as low, forward curve (or +10%) as high.
        if let (Some(prod), Some(price)) =
            (self.params.production_volume, self.params.realized_price)
        {
            let price_low = price;
            let price_high = match self.params.forward_curve_price {
                Some(fwd) if fwd > price => fwd,
                _ => price * 1.1,
            };
            let rev_low = round0(prod * price_low / 4.0);
            let rev_high = round0(prod * price_high / 4.0);
            let rev_mid = round0((rev_low + rev_high) / 2.0);
            expectations.push(Expectation {
                metric_name: "revenue".to_string(),
                period: period.to_string(),
                expected_low: rev_low,
                expected_mid: rev_mid,
                expected_high: rev_high,
                expected_unit: "M".to_string(),
                assumption_basis: format!(
                    "{} Bcf production at ${:.2}-${:.2} realized",
                    round0(prod / 4.0),
                    price_low,
                    price_high
                ),
            });
        }

        // OCF: quarterly proration with a +/-10% band.
        if let Some(ocf) = self.operating_cash_flow() {
            let ocf_mid = round0(ocf / 4.0);
            expectations.push(Expectation {
                metric_name: "operating_cash_flow".to_string(),
                period: period.to_string(),
                expected_low: round0(ocf_mid * 0.9),
                expected_mid: ocf_mid,
                expected_high: round0(ocf_mid * 1.1),
                expected_unit: "M".to_string(),
                assumption_basis: format!("${ocf}M annual OCF prorated quarterly"),
            });
        }

        // Capex: guidance range prorated as-is.
        if let Some(capex_low) = self.capex_low() {
            let capex_high = self.capex_high().unwrap_or(capex_low);
            let q_low = round0(capex_low / 4.0);
            let q_high = round0(capex_high / 4.0);
            let q_mid = round0((q_low + q_high) / 2.0);
            expectations.push(Expectation {
                metric_name: "capex".to_string(),
                period: period.to_string(),
                expected_low: q_low,
                expected_mid: q_mid,
                expected_high: q_high,
                expected_unit: "M".to_string(),
                assumption_basis: format!("${capex_low}-${capex_high}M annual guidance prorated"),
            });
        }

        // Production: quarterly proration with a +/-3% band.
        if let Some(prod) = self.params.production_volume {
            let q_prod = round_dp(prod / 4.0, 1);
            let unit = self
                .params
                .production_unit
                .clone()
                .unwrap_or_else(|| "Bcf".to_string());
            expectations.push(Expectation {
                metric_name: "production_volume".to_string(),
                period: period.to_string(),
                expected_low: round_dp(q_prod * 0.97, 1),
                expected_mid: q_prod,
                expected_high: round_dp(q_prod * 1.03, 1),
                expected_unit: unit.clone(),
                assumption_basis: format!("{prod} {unit} annual guidance prorated, +/-3%"),
            });
        }

        // Funding gap: annual gap prorated.
        if let Some(gap) = self.funding_gap() {
            let q_low = round0(gap.low / 4.0);
            let q_high = round0(gap.high / 4.0);
            let q_mid = round0((q_low + q_high) / 2.0);
            expectations.push(Expectation {
                metric_name: "funding_gap".to_string(),
                period: period.to_string(),
                expected_low: q_low,
                expected_mid: q_mid,
                expected_high: q_high,
                expected_unit: "M".to_string(),
                assumption_basis: format!("${}-${}M annual gap prorated", gap.low, gap.high),
            });
        }

        expectations
    }

    /// Score observed actuals against published expectations.
    ///
    /// Inside the range confirms the thesis. Outside, more than 25% off the
    /// midpoint breaks it and more than 5% challenges it (the 15-25% band
    /// intentionally classifies the same as 5-15%).
    pub fn score_actuals(
        expectations: &[Expectation],
        actuals: &HashMap<String, f64>,
    ) -> Vec<ExpectationResult> {
        let mut results = Vec::new();
        for exp in expectations {
            let actual = match actuals.get(&exp.metric_name) {
                Some(a) => *a,
                None => continue,
            };

            let vs_pct = if exp.expected_mid != 0.0 {
                Some(round_dp(
                    (actual - exp.expected_mid) / exp.expected_mid.abs() * 100.0,
                    2,
                ))
            } else {
                None
            };

            let within_range = exp.expected_low <= actual && actual <= exp.expected_high;

            let impact = if within_range {
                ThesisImpact::Confirms
            } else {
                match vs_pct {
                    Some(pct) if pct.abs() > 25.0 => ThesisImpact::Breaks,
                    Some(pct) if pct.abs() > 5.0 => ThesisImpact::Challenges,
                    _ => ThesisImpact::Neutral,
                }
            };

            results.push(ExpectationResult {
                metric_name: exp.metric_name.clone(),
                expected_low: exp.expected_low,
                expected_mid: exp.expected_mid,
                expected_high: exp.expected_high,
                actual_value: actual,
                vs_expected_pct: vs_pct,
                within_range,
                thesis_impact: impact,
            });
        }
        results
    }

    /// Check kill criteria against observed actuals. A criterion with no
    /// matching actual, no threshold or an unrecognized operator is simply
    /// not triggered, never an error.
    pub fn check_kill_criteria(
        criteria: &[KillCriterion],
        actuals: &HashMap<String, f64>,
    ) -> Vec<KillCheck> {
        kill_criteria::check_all(criteria, actuals)
    }
}
