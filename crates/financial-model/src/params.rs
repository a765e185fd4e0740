use serde::{Deserialize, Serialize};
use thesis_core::{ClaimMap, MarketContext};

/// Flattened numeric snapshot the model computes from. Built from the
/// thesis claim map plus external market context. Any field may be absent;
/// absence propagates through the model as "metric unavailable".
///
/// Unit contract: volumes in Bcf/Bcfe, prices in $/Mcf ($/Mcfe), dollar
/// amounts in millions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParameters {
    pub production_volume: Option<f64>,
    pub production_unit: Option<String>,
    pub realized_price: Option<f64>,
    pub price_unit: Option<String>,
    /// LOE + gathering per Mcfe.
    pub operating_cost_per_unit: Option<f64>,
    pub capex_low: Option<f64>,
    pub capex_high: Option<f64>,
    pub hedge_volume: Option<f64>,
    pub hedge_price: Option<f64>,
    pub forward_curve_price: Option<f64>,
    pub prior_capex: Option<f64>,
    pub prior_production: Option<f64>,
    /// Reported OCF, used as-is when available.
    pub operating_cash_flow: Option<f64>,
    pub net_debt: Option<f64>,
    pub interest_expense: Option<f64>,
    pub credit_facility_available: Option<f64>,
    pub debt_maturity_next: Option<f64>,
    pub total_long_term_debt: Option<f64>,
    pub maintenance_capex: Option<f64>,
}

impl ModelParameters {
    /// Bridge from the stored claim map (and optional market context) to
    /// model input.
    pub fn from_claims(claims: &ClaimMap, context: Option<&MarketContext>) -> Self {
        let val = |name: &str| claims.get(name).and_then(|c| c.value);
        let low = |name: &str| claims.get(name).and_then(|c| c.low);
        let high = |name: &str| claims.get(name).and_then(|c| c.high);
        let unit = |name: &str| claims.get(name).and_then(|c| c.unit.clone());

        Self {
            production_volume: val("production_volume"),
            production_unit: unit("production_volume").or_else(|| Some("Bcfe".to_string())),
            realized_price: val("realized_price"),
            price_unit: unit("realized_price").or_else(|| Some("$/Mcfe".to_string())),
            operating_cost_per_unit: val("operating_cost_per_unit"),
            capex_low: low("capex_guidance").or_else(|| val("capex_guidance")),
            capex_high: high("capex_guidance").or_else(|| val("capex_guidance")),
            hedge_volume: val("hedge_volume"),
            hedge_price: claims
                .get("hedge_volume")
                .and_then(|c| c.price)
                .or_else(|| val("hedge_price")),
            forward_curve_price: context.and_then(|ctx| ctx.forward_price()),
            prior_capex: val("prior_capex"),
            prior_production: val("prior_production"),
            operating_cash_flow: val("operating_cash_flow"),
            net_debt: val("net_debt"),
            interest_expense: val("interest_expense"),
            credit_facility_available: val("credit_facility_available"),
            debt_maturity_next: val("debt_maturity_next"),
            total_long_term_debt: val("total_long_term_debt"),
            maintenance_capex: val("maintenance_capex"),
        }
    }
}
