use crate::thesis::{NewData, Thesis};
use chrono::{NaiveDate, Utc};
use financial_model::{FinancialModel, ModelParameters};
use guidance_tracker::GuidanceRevision;
use hypothesis_tracker::HypothesisChange;
use kill_criteria::KillCheck;
use management_scorecard::ScorecardOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thesis_core::{EvidenceInterpreter, InterpretationRequest};
use tracing::{debug, info, warn};

/// What kind of change an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Kill,
    Scorecard,
    Guidance,
    Hypothesis,
}

/// One materially significant change detected during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

/// Everything one monitoring cycle did to a thesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub ticker: String,
    pub alerts: Vec<Alert>,
    pub kill_checks: Vec<KillCheck>,
    pub scorecard_outcomes: Vec<ScorecardOutcome>,
    pub guidance_revisions: Vec<GuidanceRevision>,
    pub hypothesis_changes: Vec<HypothesisChange>,
    /// True when the interpreter call failed or timed out and evidence
    /// logging was skipped for this cycle.
    pub evidence_skipped: bool,
}

impl CycleOutcome {
    fn silent(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Default::default()
        }
    }

    pub fn is_silent(&self) -> bool {
        self.alerts.is_empty()
            && self.kill_checks.is_empty()
            && self.scorecard_outcomes.is_empty()
            && self.guidance_revisions.is_empty()
            && self.hypothesis_changes.is_empty()
    }
}

/// Drives the per-thesis check cycle. One monitor serves many theses; each
/// thesis is updated by exactly one entry point per cycle.
pub struct ThesisMonitor {
    interpreter: Option<Arc<dyn EvidenceInterpreter>>,
    interpreter_timeout: Duration,
}

impl Default for ThesisMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThesisMonitor {
    pub fn new() -> Self {
        Self {
            interpreter: None,
            interpreter_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn EvidenceInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn with_interpreter_timeout(mut self, timeout: Duration) -> Self {
        self.interpreter_timeout = timeout;
        self
    }

    /// Run one monitoring cycle for one thesis.
    ///
    /// With no new data this returns immediately: no alerts, no state
    /// changes, not even a timestamp bump. Otherwise it runs kill checks,
    /// scorecard reconciliation and guidance detection synchronously, then
    /// asks the interpreter to read the evidence; interpreter failure only
    /// skips the evidence step.
    pub async fn monitor_thesis(
        &self,
        thesis: &mut Thesis,
        new_data: &NewData,
        as_of: NaiveDate,
    ) -> CycleOutcome {
        if new_data.is_empty() {
            debug!(ticker = %thesis.ticker, "no new data, staying silent");
            return CycleOutcome::silent(&thesis.ticker);
        }

        info!(
            ticker = %thesis.ticker,
            filings = new_data.filings.len(),
            metrics = new_data.metrics.len(),
            sources = new_data.sources.len(),
            "new data detected"
        );

        let mut outcome = CycleOutcome::silent(&thesis.ticker);
        let actuals = new_data.actuals();

        // Refresh derived claims against the latest market context before
        // any comparisons read them.
        let params = ModelParameters::from_claims(&thesis.financial_claims, new_data.market.as_ref());
        let model = FinancialModel::new(params);
        model.compute_derived_claims(&mut thesis.financial_claims);

        // 1. Kill criteria. Only untriggered criteria are live; the
        // transition is one-way and keeps its first date.
        if !actuals.is_empty() {
            let untriggered: Vec<_> = thesis
                .kill_criteria
                .iter()
                .filter(|c| !c.triggered)
                .cloned()
                .collect();
            let checks = FinancialModel::check_kill_criteria(&untriggered, &actuals);
            for check in &checks {
                if !check.operator_recognized {
                    warn!(
                        ticker = %thesis.ticker,
                        criterion_id = check.criterion_id,
                        "kill criterion has unusable operator, skipping"
                    );
                }
                if check.triggered {
                    let evidence = check.evidence().unwrap_or_default();
                    if let Some(criterion) = thesis
                        .kill_criteria
                        .iter_mut()
                        .find(|c| c.id == check.criterion_id)
                    {
                        criterion.trigger(as_of, &evidence);
                    }
                    let message = format!(
                        "KILL CRITERION TRIGGERED: {} (actual {}={} {} {})",
                        check.criterion,
                        check.metric_name,
                        check.actual_value.unwrap_or_default(),
                        check.threshold_operator.as_deref().unwrap_or("?"),
                        check.threshold_value.unwrap_or_default(),
                    );
                    info!(ticker = %thesis.ticker, %message);
                    outcome.alerts.push(Alert {
                        kind: AlertKind::Kill,
                        message,
                    });
                }
            }
            outcome.kill_checks = checks;
        }

        // 2. Management scorecard.
        if !actuals.is_empty() {
            let settled =
                management_scorecard::reconcile_pending(&mut thesis.scorecard, &actuals, as_of);
            for s in &settled {
                outcome.alerts.push(Alert {
                    kind: AlertKind::Scorecard,
                    message: s.message.clone(),
                });
            }
            outcome.scorecard_outcomes = settled;
        }

        // 3. Guidance revisions.
        for stmt in &new_data.forward_statements {
            if let Some(revision) = thesis.guidance.observe(stmt, as_of) {
                if let Some(alert) = &revision.alert {
                    info!(ticker = %thesis.ticker, message = %alert.message);
                    outcome.alerts.push(Alert {
                        kind: AlertKind::Guidance,
                        message: alert.message.clone(),
                    });
                }
                outcome.guidance_revisions.push(revision);
            }
        }

        // 4. Evidence interpretation, delegated and time-bounded. Failure
        // degrades to "no evidence this cycle".
        self.interpret_and_apply(thesis, new_data, as_of, &mut outcome)
            .await;

        thesis.last_checked = Some(Utc::now());

        if outcome.alerts.is_empty() {
            debug!(ticker = %thesis.ticker, "cycle complete, nothing material");
        } else {
            info!(
                ticker = %thesis.ticker,
                alerts = outcome.alerts.len(),
                "cycle complete"
            );
        }
        outcome
    }

    async fn interpret_and_apply(
        &self,
        thesis: &mut Thesis,
        new_data: &NewData,
        as_of: NaiveDate,
        outcome: &mut CycleOutcome,
    ) {
        let interpreter = match &self.interpreter {
            Some(i) => i,
            None => return,
        };
        if thesis.open_hypotheses().next().is_none() {
            return;
        }

        let request = InterpretationRequest {
            thesis_summary: thesis.thesis_summary.clone(),
            hypotheses: thesis.open_hypotheses().map(Into::into).collect(),
            new_data: new_data.digest(),
        };

        let response =
            match tokio::time::timeout(self.interpreter_timeout, interpreter.interpret(&request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(ticker = %thesis.ticker, error = %e, "evidence interpretation failed, skipping this cycle");
                    outcome.evidence_skipped = true;
                    return;
                }
                Err(_) => {
                    warn!(ticker = %thesis.ticker, "evidence interpretation timed out, skipping this cycle");
                    outcome.evidence_skipped = true;
                    return;
                }
            };

        let (source_type, source_ref, source_date) = match new_data.filings.first() {
            Some(f) => (
                "filing",
                f.accession_number
                    .clone()
                    .or_else(|| f.id.map(|id| id.to_string())),
                f.filing_date,
            ),
            None => ("external", None, as_of),
        };

        let updates = hypothesis_tracker::validate_updates(&response, &thesis.hypotheses);
        for update in &updates {
            let hypothesis = match thesis
                .hypotheses
                .iter_mut()
                .find(|h| h.id == update.hypothesis_id)
            {
                Some(h) => h,
                None => continue,
            };
            if let Some(change) = hypothesis_tracker::apply_update(
                hypothesis,
                update,
                source_type,
                source_ref.clone(),
                source_date,
            ) {
                if change.status_changed {
                    let message = change.message();
                    info!(ticker = %thesis.ticker, %message);
                    outcome.alerts.push(Alert {
                        kind: AlertKind::Hypothesis,
                        message,
                    });
                } else {
                    debug!(
                        ticker = %thesis.ticker,
                        hypothesis_id = change.hypothesis_id,
                        "evidence logged without status change"
                    );
                }
                outcome.hypothesis_changes.push(change);
            }
        }
    }

    /// Monitor several theses in one pass. Theses with no new data are
    /// skipped silently.
    pub async fn monitor_all(
        &self,
        theses: &mut [Thesis],
        data_by_ticker: &HashMap<String, NewData>,
        as_of: NaiveDate,
    ) -> Vec<CycleOutcome> {
        let empty = NewData::default();
        let mut outcomes = Vec::with_capacity(theses.len());
        for thesis in theses.iter_mut() {
            let new_data = data_by_ticker.get(&thesis.ticker).unwrap_or(&empty);
            outcomes.push(self.monitor_thesis(thesis, new_data, as_of).await);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use thesis_core::{
        ClaimSource, EngineError, FilingRef, FinancialClaim, ForwardStatement, Hypothesis,
        HypothesisStatus, InterpretationResponse, KillCriterion, MetricObservation,
        RawEvidenceUpdate, ScorecardEntry,
    };

    struct CannedInterpreter {
        response: InterpretationResponse,
    }

    #[async_trait]
    impl EvidenceInterpreter for CannedInterpreter {
        async fn interpret(
            &self,
            _request: &InterpretationRequest,
        ) -> Result<InterpretationResponse, EngineError> {
            Ok(self.response.clone())
        }
    }

    struct FailingInterpreter;

    #[async_trait]
    impl EvidenceInterpreter for FailingInterpreter {
        async fn interpret(
            &self,
            _request: &InterpretationRequest,
        ) -> Result<InterpretationResponse, EngineError> {
            Err(EngineError::ExternalService("503".to_string()))
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    }

    fn sample_thesis() -> Thesis {
        let mut thesis = Thesis::new(
            1,
            "CRK",
            "Comstock Resources",
            "Hedged gas producer self-funds through the 2026 strip",
        );
        thesis.financial_claims.insert(
            "production_volume".to_string(),
            FinancialClaim::point(590.0, "Bcf", ClaimSource::Filing),
        );
        thesis.financial_claims.insert(
            "realized_price".to_string(),
            FinancialClaim::point(2.87, "$/Mcf", ClaimSource::Filing),
        );
        thesis.financial_claims.insert(
            "capex_guidance".to_string(),
            FinancialClaim::range(1400.0, 1500.0, "M", ClaimSource::Filing),
        );
        thesis.financial_claims.insert(
            "operating_cash_flow".to_string(),
            FinancialClaim::point(861.0, "M", ClaimSource::Filing),
        );
        thesis.kill_criteria.push(KillCriterion::new(
            1,
            "Capex guidance raised above $1.5B",
            "capex_guidance",
            1500.0,
            ">",
        ));
        thesis.hypotheses.push(Hypothesis::new(
            1,
            "Hedge book shields FY2026 cash flow",
            "Unhedged volumes force capex cuts",
            50.0,
        ));
        thesis.scorecard.push(ScorecardEntry::new(
            1,
            "Hold FY2025 capex to $1.4-1.5B",
            "capex_guidance",
            Some(1400.0),
            Some(1500.0),
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        ));
        thesis
    }

    fn filing_data(metrics: &[(&str, f64)]) -> NewData {
        NewData {
            filings: vec![FilingRef {
                id: Some(72),
                filing_type: "10-Q".to_string(),
                filing_date: as_of(),
                accession_number: None,
            }],
            metrics: metrics
                .iter()
                .map(|(name, value)| MetricObservation {
                    metric_name: name.to_string(),
                    value: *value,
                    unit: None,
                    period: None,
                })
                .collect(),
            forward_statements: Vec::new(),
            sources: Vec::new(),
            market: None,
        }
    }

    #[tokio::test]
    async fn empty_data_means_total_silence() {
        let monitor = ThesisMonitor::new();
        let mut thesis = sample_thesis();
        let before = thesis.clone();

        let outcome = monitor
            .monitor_thesis(&mut thesis, &NewData::default(), as_of())
            .await;

        assert!(outcome.is_silent());
        assert!(thesis.last_checked.is_none());
        assert_eq!(thesis.financial_claims, before.financial_claims);
        assert!(!thesis.kill_criteria[0].triggered);
        assert!(thesis.hypotheses[0].evidence_log.is_empty());
    }

    #[tokio::test]
    async fn kill_and_scorecard_fire_from_one_actual() {
        let monitor = ThesisMonitor::new();
        let mut thesis = sample_thesis();

        let outcome = monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("capex_guidance", 1520.0)]), as_of())
            .await;

        let kill: Vec<_> = outcome
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::Kill)
            .collect();
        assert_eq!(kill.len(), 1);
        assert!(kill[0].message.contains("actual capex_guidance=1520 > 1500"));
        assert!(thesis.kill_criteria[0].triggered);
        assert_eq!(thesis.kill_criteria[0].triggered_date, Some(as_of()));

        // 1520 exceeds the promised 1400-1500 range.
        let scorecard: Vec<_> = outcome
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::Scorecard)
            .collect();
        assert_eq!(scorecard.len(), 1);
        assert!(scorecard[0].message.contains("EXCEEDED"));

        assert!(thesis.last_checked.is_some());
    }

    #[tokio::test]
    async fn triggered_criteria_do_not_refire() {
        let monitor = ThesisMonitor::new();
        let mut thesis = sample_thesis();

        monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("capex_guidance", 1520.0)]), as_of())
            .await;
        let first_date = thesis.kill_criteria[0].triggered_date;

        let later = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let outcome = monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("capex_guidance", 1600.0)]), later)
            .await;

        assert!(outcome.alerts.iter().all(|a| a.kind != AlertKind::Kill));
        assert_eq!(thesis.kill_criteria[0].triggered_date, first_date);
    }

    #[tokio::test]
    async fn guidance_revision_raises_alert() {
        let monitor = ThesisMonitor::new();
        let mut thesis = sample_thesis();

        let mut data = filing_data(&[]);
        data.forward_statements.push(ForwardStatement {
            category: "capex".to_string(),
            statement_text: None,
            quantitative_value: Some(1450.0),
            unit: Some("M".to_string()),
            timeframe: Some("FY2026".to_string()),
        });
        monitor.monitor_thesis(&mut thesis, &data, as_of()).await;

        data.forward_statements[0].quantitative_value = Some(1750.0);
        let outcome = monitor.monitor_thesis(&mut thesis, &data, as_of()).await;

        assert!(outcome
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::Guidance && a.message.contains("20.7%")));
        assert_eq!(
            thesis.guidance.current("capex_guidance").unwrap().value_low,
            1750.0
        );
    }

    #[tokio::test]
    async fn interpreter_updates_flow_through_validation() {
        let interpreter = CannedInterpreter {
            response: InterpretationResponse {
                updates: vec![
                    RawEvidenceUpdate {
                        hypothesis_id: 1,
                        direction: "for".to_string(),
                        evidence: "Hedge book extended into 2027".to_string(),
                        new_status: "strengthened".to_string(),
                        new_confidence: 165.0, // clamped to 100
                    },
                    RawEvidenceUpdate {
                        hypothesis_id: 99, // unknown, discarded
                        direction: "for".to_string(),
                        evidence: "n/a".to_string(),
                        new_status: "strengthened".to_string(),
                        new_confidence: 60.0,
                    },
                ],
                summary: None,
            },
        };
        let monitor = ThesisMonitor::new().with_interpreter(Arc::new(interpreter));
        let mut thesis = sample_thesis();

        let outcome = monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("revenue", 430.0)]), as_of())
            .await;

        assert_eq!(outcome.hypothesis_changes.len(), 1);
        assert_eq!(thesis.hypotheses[0].status, HypothesisStatus::Strengthened);
        assert_eq!(thesis.hypotheses[0].confidence, 100.0);
        assert_eq!(thesis.hypotheses[0].evidence_log.len(), 1);
        assert_eq!(
            thesis.hypotheses[0].evidence_log[0].source_ref.as_deref(),
            Some("72")
        );
        assert!(outcome
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::Hypothesis));
    }

    #[tokio::test]
    async fn interpreter_failure_only_skips_evidence() {
        let monitor = ThesisMonitor::new().with_interpreter(Arc::new(FailingInterpreter));
        let mut thesis = sample_thesis();

        let outcome = monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("capex_guidance", 1520.0)]), as_of())
            .await;

        assert!(outcome.evidence_skipped);
        assert!(thesis.hypotheses[0].evidence_log.is_empty());
        // Kill and scorecard results computed before the failure are kept.
        assert!(outcome.alerts.iter().any(|a| a.kind == AlertKind::Kill));
        assert!(thesis.last_checked.is_some());
    }

    #[tokio::test]
    async fn derived_claims_refresh_during_cycle() {
        let monitor = ThesisMonitor::new();
        let mut thesis = sample_thesis();

        monitor
            .monitor_thesis(&mut thesis, &filing_data(&[("revenue", 430.0)]), as_of())
            .await;

        let gap = &thesis.financial_claims["funding_gap"];
        assert_eq!(gap.source, ClaimSource::Derived);
        assert_eq!(gap.low, Some(539.0));
        assert_eq!(gap.high, Some(639.0));
    }

    #[tokio::test]
    async fn monitor_all_skips_theses_without_data() {
        let monitor = ThesisMonitor::new();
        let mut theses = vec![sample_thesis(), {
            let mut t = sample_thesis();
            t.id = 2;
            t.ticker = "EQT".to_string();
            t
        }];

        let mut data = HashMap::new();
        data.insert("CRK".to_string(), filing_data(&[("capex_guidance", 1520.0)]));

        let outcomes = monitor.monitor_all(&mut theses, &data, as_of()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_silent());
        assert!(outcomes[1].is_silent());
        assert!(theses[1].last_checked.is_none());
    }
}
