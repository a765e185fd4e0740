use chrono::{DateTime, Utc};
use guidance_tracker::GuidanceHistory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thesis_core::{
    ClaimMap, FilingRef, ForwardStatement, Hypothesis, KillCriterion, MarketContext,
    MetricObservation, NewDataDigest, ScorecardEntry, SourceRef,
};

/// An investment thesis as an owned aggregate: claims, kill criteria,
/// hypotheses, scorecard and guidance history for one company.
///
/// All mutation goes through the monitor's per-cycle entry point. Theses
/// share no state with each other, so separate theses may be evaluated
/// concurrently; updates to one thesis must be serialized by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub id: u64,
    pub ticker: String,
    pub company_name: String,
    pub thesis_summary: String,
    pub financial_claims: ClaimMap,
    pub kill_criteria: Vec<KillCriterion>,
    pub hypotheses: Vec<Hypothesis>,
    pub scorecard: Vec<ScorecardEntry>,
    pub guidance: GuidanceHistory,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Thesis {
    pub fn new(id: u64, ticker: &str, company_name: &str, thesis_summary: &str) -> Self {
        Self {
            id,
            ticker: ticker.to_string(),
            company_name: company_name.to_string(),
            thesis_summary: thesis_summary.to_string(),
            financial_claims: ClaimMap::new(),
            kill_criteria: Vec::new(),
            hypotheses: Vec::new(),
            scorecard: Vec::new(),
            guidance: GuidanceHistory::new(),
            last_checked: None,
        }
    }

    /// Hypotheses still accepting evidence.
    pub fn open_hypotheses(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypotheses.iter().filter(|h| h.is_open())
    }
}

/// Everything that arrived since the last check for one company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewData {
    pub filings: Vec<FilingRef>,
    pub metrics: Vec<MetricObservation>,
    pub forward_statements: Vec<ForwardStatement>,
    pub sources: Vec<SourceRef>,
    /// Market context is background, not news; it never counts as new data
    /// on its own.
    #[serde(default)]
    pub market: Option<MarketContext>,
}

impl NewData {
    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
            && self.metrics.is_empty()
            && self.forward_statements.is_empty()
            && self.sources.is_empty()
    }

    /// Observed actuals keyed by canonical metric name.
    pub fn actuals(&self) -> HashMap<String, f64> {
        self.metrics
            .iter()
            .map(|m| (m.metric_name.clone(), m.value))
            .collect()
    }

    /// The digest handed to the reasoning service.
    pub fn digest(&self) -> NewDataDigest {
        NewDataDigest {
            new_metrics: self.metrics.clone(),
            new_filings: self.filings.clone(),
            new_sources: self.sources.clone(),
        }
    }
}
