use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a financial claim came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimSource {
    /// Taken directly from a regulatory filing.
    Filing,
    /// Computed by the financial model from other claims.
    Derived,
    /// Supplied by an external data provider (forward curves, strips).
    External,
}

/// A named financial metric with either a point value or a low/high range.
///
/// Claims tagged `Derived` are reproducible from the rest of the claim map
/// plus market context; they are never hand-authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialClaim {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    /// Price attached to a volume claim (e.g. hedge volume at hedge price).
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    /// Free-text methodology note for derived claims.
    #[serde(default)]
    pub basis: Option<String>,
    pub source: ClaimSource,
    /// Composite payload for multi-part diagnostics (funding gap coverage).
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl FinancialClaim {
    pub fn point(value: f64, unit: &str, source: ClaimSource) -> Self {
        Self {
            value: Some(value),
            low: None,
            high: None,
            price: None,
            unit: Some(unit.to_string()),
            period: None,
            basis: None,
            source,
            detail: None,
        }
    }

    pub fn range(low: f64, high: f64, unit: &str, source: ClaimSource) -> Self {
        Self {
            value: None,
            low: Some(low),
            high: Some(high),
            price: None,
            unit: Some(unit.to_string()),
            period: None,
            basis: None,
            source,
            detail: None,
        }
    }

    pub fn with_basis(mut self, basis: &str) -> Self {
        self.basis = Some(basis.to_string());
        self
    }
}

/// Thesis assumptions keyed by canonical metric name.
pub type ClaimMap = BTreeMap<String, FinancialClaim>;

/// A low/high pair in millions of dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DollarRange {
    pub low: f64,
    pub high: f64,
}

/// External forward-curve context from market data providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketContext {
    #[serde(default)]
    pub strip_12m: Option<f64>,
    #[serde(default)]
    pub strip_24m: Option<f64>,
    #[serde(default)]
    pub winter_strip: Option<f64>,
    #[serde(default)]
    pub summer_strip: Option<f64>,
    /// Named futures points, e.g. "12_month", "cal_2026".
    #[serde(default)]
    pub futures: BTreeMap<String, f64>,
    #[serde(default)]
    pub spot_price: Option<f64>,
}

impl MarketContext {
    /// Best available forward price: 12-month strip average, then a named
    /// futures point, then spot.
    pub fn forward_price(&self) -> Option<f64> {
        if self.strip_12m.is_some() {
            return self.strip_12m;
        }
        for key in ["12_month", "12m", "cal_2026", "cal_2027"] {
            if let Some(price) = self.futures.get(key) {
                return Some(*price);
            }
        }
        self.spot_price
    }
}

/// A hard exit condition attached to a thesis. Transitions once,
/// irreversibly, from untriggered to triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillCriterion {
    pub id: u64,
    /// Human-readable criterion text.
    pub criterion: String,
    pub metric_name: String,
    pub threshold_value: Option<f64>,
    /// Comparison operator as stored (">", "<", ">=", "<=", "=", "!=").
    /// Kept as a string so unrecognized operators survive to evaluation,
    /// where they are treated as non-triggering data-quality problems.
    pub threshold_operator: Option<String>,
    pub threshold_unit: Option<String>,
    pub triggered: bool,
    pub triggered_date: Option<NaiveDate>,
    pub triggered_evidence: Option<String>,
}

impl KillCriterion {
    pub fn new(
        id: u64,
        criterion: &str,
        metric_name: &str,
        threshold_value: f64,
        threshold_operator: &str,
    ) -> Self {
        Self {
            id,
            criterion: criterion.to_string(),
            metric_name: metric_name.to_string(),
            threshold_value: Some(threshold_value),
            threshold_operator: Some(threshold_operator.to_string()),
            threshold_unit: None,
            triggered: false,
            triggered_date: None,
            triggered_evidence: None,
        }
    }

    /// Mark as triggered. Idempotent: a criterion that already fired keeps
    /// its original date and evidence.
    pub fn trigger(&mut self, date: NaiveDate, evidence: &str) {
        if self.triggered {
            return;
        }
        self.triggered = true;
        self.triggered_date = Some(date);
        self.triggered_evidence = Some(evidence.to_string());
    }
}

/// Hypothesis lifecycle. `Disproved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypothesisStatus {
    Active,
    Strengthened,
    Weakened,
    Disproved,
}

impl HypothesisStatus {
    /// Parse an untrusted status string from the reasoning service.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(HypothesisStatus::Active),
            "strengthened" => Some(HypothesisStatus::Strengthened),
            "weakened" => Some(HypothesisStatus::Weakened),
            "disproved" => Some(HypothesisStatus::Disproved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Active => "active",
            HypothesisStatus::Strengthened => "strengthened",
            HypothesisStatus::Weakened => "weakened",
            HypothesisStatus::Disproved => "disproved",
        }
    }
}

/// Which way a piece of evidence cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceDirection {
    For,
    Against,
}

impl EvidenceDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "for" => Some(EvidenceDirection::For),
            "against" => Some(EvidenceDirection::Against),
            _ => None,
        }
    }
}

/// One logged observation for or against a hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub direction: EvidenceDirection,
    pub evidence: String,
    pub source_type: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub source_date: NaiveDate,
}

/// A testable belief with an explicit counter-belief, a confidence level
/// and an ordered evidence log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: u64,
    pub hypothesis: String,
    pub counter_hypothesis: String,
    /// Interpretation guides for the reasoning service; never parsed.
    #[serde(default)]
    pub confirming_evidence: Option<String>,
    #[serde(default)]
    pub disproving_evidence: Option<String>,
    pub status: HypothesisStatus,
    /// 0-100.
    pub confidence: f64,
    #[serde(default)]
    pub evidence_log: Vec<EvidenceEntry>,
}

impl Hypothesis {
    pub fn new(id: u64, hypothesis: &str, counter_hypothesis: &str, confidence: f64) -> Self {
        Self {
            id,
            hypothesis: hypothesis.to_string(),
            counter_hypothesis: counter_hypothesis.to_string(),
            confirming_evidence: None,
            disproving_evidence: None,
            status: HypothesisStatus::Active,
            confidence: confidence.clamp(0.0, 100.0),
            evidence_log: Vec::new(),
        }
    }

    /// Disproved hypotheses accept no further updates.
    pub fn is_open(&self) -> bool {
        self.status != HypothesisStatus::Disproved
    }
}

/// Scorecard outcome for a management promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assessment {
    Pending,
    Delivered,
    Exceeded,
    Missed,
}

/// A tracked management promise pending comparison against an actual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardEntry {
    pub id: u64,
    pub promise_text: String,
    pub promise_metric: String,
    #[serde(default)]
    pub promise_value_low: Option<f64>,
    #[serde(default)]
    pub promise_value_high: Option<f64>,
    #[serde(default)]
    pub promise_unit: Option<String>,
    pub promise_date: NaiveDate,
    pub assessment: Assessment,
    #[serde(default)]
    pub actual_value: Option<f64>,
    #[serde(default)]
    pub actual_date: Option<NaiveDate>,
    #[serde(default)]
    pub delta_pct: Option<f64>,
}

impl ScorecardEntry {
    pub fn new(
        id: u64,
        promise_text: &str,
        promise_metric: &str,
        low: Option<f64>,
        high: Option<f64>,
        promise_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            promise_text: promise_text.to_string(),
            promise_metric: promise_metric.to_string(),
            promise_value_low: low,
            promise_value_high: high,
            promise_unit: None,
            promise_date,
            assessment: Assessment::Pending,
            actual_value: None,
            actual_date: None,
            delta_pct: None,
        }
    }
}

/// One historical guidance observation for a (company, metric) pair.
/// Records form a singly linked chronological chain per metric; the record
/// with no successor is current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceRecord {
    pub metric_name: String,
    pub value_low: f64,
    pub value_high: f64,
    pub unit: String,
    pub period: String,
    pub source_date: NaiveDate,
    /// Percent drift vs. the immediately prior record; None for the
    /// first-ever guidance on a metric.
    pub revision_pct: Option<f64>,
    /// Arena index of the record that replaced this one.
    pub superseded_by: Option<usize>,
}

impl GuidanceRecord {
    pub fn midpoint(&self) -> f64 {
        (self.value_low + self.value_high) / 2.0
    }
}

/// A forward-looking statement extracted from a filing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardStatement {
    pub category: String,
    #[serde(default)]
    pub statement_text: Option<String>,
    #[serde(default)]
    pub quantitative_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
}

/// Classified effect of an actual on the thesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThesisImpact {
    Confirms,
    Challenges,
    Breaks,
    Neutral,
}

/// A published quarterly projection for one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    pub metric_name: String,
    pub period: String,
    pub expected_low: f64,
    pub expected_mid: f64,
    pub expected_high: f64,
    pub expected_unit: String,
    pub assumption_basis: String,
}

/// Reconciliation of one expectation against an observed actual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub metric_name: String,
    pub expected_low: f64,
    pub expected_mid: f64,
    pub expected_high: f64,
    pub actual_value: f64,
    /// Percent deviation from the expected midpoint; None when the midpoint
    /// is zero.
    pub vs_expected_pct: Option<f64>,
    pub within_range: bool,
    pub thesis_impact: ThesisImpact,
}

/// A processed filing, referenced as an evidence source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingRef {
    #[serde(default)]
    pub id: Option<u64>,
    pub filing_type: String,
    pub filing_date: NaiveDate,
    #[serde(default)]
    pub accession_number: Option<String>,
}

/// A non-filing data source (news, transcript, external report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_type: String,
    pub title: String,
    pub published_date: NaiveDate,
}

/// One newly extracted metric observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricObservation {
    pub metric_name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

/// Hypothesis summary sent to the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisBrief {
    pub id: u64,
    pub hypothesis: String,
    pub counter_hypothesis: String,
    #[serde(default)]
    pub confirming_evidence: Option<String>,
    #[serde(default)]
    pub disproving_evidence: Option<String>,
    pub current_confidence: f64,
}

impl From<&Hypothesis> for HypothesisBrief {
    fn from(h: &Hypothesis) -> Self {
        Self {
            id: h.id,
            hypothesis: h.hypothesis.clone(),
            counter_hypothesis: h.counter_hypothesis.clone(),
            confirming_evidence: h.confirming_evidence.clone(),
            disproving_evidence: h.disproving_evidence.clone(),
            current_confidence: h.confidence,
        }
    }
}

/// What changed since the last check, as presented to the reasoning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDataDigest {
    pub new_metrics: Vec<MetricObservation>,
    pub new_filings: Vec<FilingRef>,
    pub new_sources: Vec<SourceRef>,
}

/// Request to the external evidence interpreter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretationRequest {
    pub thesis_summary: String,
    pub hypotheses: Vec<HypothesisBrief>,
    pub new_data: NewDataDigest,
}

/// One raw update from the reasoning service. Untrusted: direction and
/// status arrive as free strings and must be validated before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvidenceUpdate {
    pub hypothesis_id: u64,
    pub direction: String,
    pub evidence: String,
    pub new_status: String,
    pub new_confidence: f64,
}

/// Full response from the reasoning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpretationResponse {
    #[serde(default)]
    pub updates: Vec<RawEvidenceUpdate>,
    #[serde(default)]
    pub summary: Option<String>,
}
