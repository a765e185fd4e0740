//! Guidance-revision detection.
//!
//! Keeps one append-only chain of guidance records per metric. Each new
//! observation is compared against the current (non-superseded) record for
//! the same metric; sub-threshold drift is discarded outright, material
//! drift supersedes the prior record, and large drift additionally alerts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thesis_core::{ForwardStatement, GuidanceRecord};
use tracing::debug;

/// Revisions smaller than this are noise and are not stored at all.
pub const RECORD_THRESHOLD_PCT: f64 = 2.0;

/// Revisions larger than this raise an alert.
pub const ALERT_THRESHOLD_PCT: f64 = 15.0;

/// Forward-statement categories mapped to canonical guidance metrics.
/// Ordered: more specific keys first so the substring fallback cannot
/// shadow them.
const CATEGORY_TO_METRIC: &[(&str, &str)] = &[
    ("capital_expenditure", "capex_guidance"),
    ("capex", "capex_guidance"),
    ("production_guidance", "production_guidance"),
    ("production", "production_guidance"),
    ("debt_reduction", "debt_reduction_target"),
    ("debt", "debt_reduction_target"),
    ("rig_count", "rig_count_guidance"),
];

/// Map a raw statement category to a guidance metric name. Exact match
/// first, then substring fallback.
pub fn metric_for_category(category: &str) -> Option<&'static str> {
    let normalized = category.trim().to_lowercase().replace(' ', "_");
    for (key, metric) in CATEGORY_TO_METRIC {
        if normalized == *key {
            return Some(metric);
        }
    }
    for (key, metric) in CATEGORY_TO_METRIC {
        if normalized.contains(key) {
            return Some(metric);
        }
    }
    None
}

/// A revision large enough to alert on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceAlert {
    pub metric_name: String,
    pub revision_pct: f64,
    pub message: String,
}

/// Outcome of recording one guidance observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceRevision {
    /// Arena index of the newly inserted record.
    pub record_index: usize,
    pub metric_name: String,
    /// None for the first-ever guidance on this metric.
    pub revision_pct: Option<f64>,
    pub alert: Option<GuidanceAlert>,
}

/// Per-company guidance store: an arena of records plus a per-metric index
/// of the current record, so lookups never walk the supersession chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidanceHistory {
    records: Vec<GuidanceRecord>,
    current: HashMap<String, usize>,
}

impl GuidanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever kept, in insertion order.
    pub fn records(&self) -> &[GuidanceRecord] {
        &self.records
    }

    /// The current (non-superseded) record for a metric.
    pub fn current(&self, metric_name: &str) -> Option<&GuidanceRecord> {
        self.current.get(metric_name).map(|idx| &self.records[*idx])
    }

    /// Record one forward statement. Returns None when the statement does
    /// not map to a guidance metric, carries no quantitative value, or
    /// drifts less than [`RECORD_THRESHOLD_PCT`] from the current record;
    /// in all of which cases nothing is written.
    pub fn observe(
        &mut self,
        stmt: &ForwardStatement,
        source_date: NaiveDate,
    ) -> Option<GuidanceRevision> {
        let metric_name = metric_for_category(&stmt.category)?;
        let quant = stmt.quantitative_value?;

        let new_low = quant;
        let new_high = quant;
        let new_mid = (new_low + new_high) / 2.0;
        let unit = stmt.unit.clone().unwrap_or_default();
        let period = stmt.timeframe.clone().unwrap_or_default();

        let prior_idx = self.current.get(metric_name).copied();
        let mut revision_pct = None;
        let mut prior_desc = None;

        if let Some(idx) = prior_idx {
            let prior = &self.records[idx];
            let prior_mid = prior.midpoint();
            if prior_mid > 0.0 {
                revision_pct = Some(round2((new_mid - prior_mid) / prior_mid * 100.0));
            }

            if let Some(pct) = revision_pct {
                if pct.abs() < RECORD_THRESHOLD_PCT {
                    debug!(
                        metric = metric_name,
                        revision_pct = pct,
                        "guidance drift below record threshold, discarding"
                    );
                    return None;
                }
            }

            prior_desc = Some(format!(
                "{}-{} {}",
                prior.value_low, prior.value_high, prior.unit
            ));
        }

        let record_index = self.records.len();
        self.records.push(GuidanceRecord {
            metric_name: metric_name.to_string(),
            value_low: new_low,
            value_high: new_high,
            unit: unit.clone(),
            period,
            source_date,
            revision_pct,
            superseded_by: None,
        });

        if let Some(idx) = prior_idx {
            self.records[idx].superseded_by = Some(record_index);
        }
        self.current.insert(metric_name.to_string(), record_index);

        let alert = revision_pct
            .filter(|pct| pct.abs() > ALERT_THRESHOLD_PCT)
            .map(|pct| {
                let direction = if pct > 0.0 { "increased" } else { "decreased" };
                GuidanceAlert {
                    metric_name: metric_name.to_string(),
                    revision_pct: pct,
                    message: format!(
                        "GUIDANCE REVISION: {} {} {:.1}% (was {}, now {}-{} {})",
                        metric_name,
                        direction,
                        pct.abs(),
                        prior_desc.as_deref().unwrap_or("n/a"),
                        new_low,
                        new_high,
                        unit
                    ),
                }
            });

        Some(GuidanceRevision {
            record_index,
            metric_name: metric_name.to_string(),
            revision_pct,
            alert,
        })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
