//! Management scorecard reconciliation.
//!
//! A scorecard entry records a management promise as a value range. When an
//! actual for the promised metric arrives, the entry transitions exactly
//! once from pending to a terminal assessment and is never re-evaluated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thesis_core::{Assessment, ScorecardEntry};
use tracing::debug;

/// Result of settling one pending promise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardOutcome {
    pub entry_id: u64,
    pub promise_text: String,
    pub assessment: Assessment,
    pub actual_value: f64,
    pub delta_pct: Option<f64>,
    pub message: String,
}

/// Classify an actual against promised bounds. Bounds are inclusive: landing
/// exactly on either end counts as delivered.
pub fn classify(low: Option<f64>, high: Option<f64>, actual: f64) -> Assessment {
    match (low, high) {
        (Some(low), Some(high)) => {
            if actual < low {
                Assessment::Missed
            } else if actual <= high {
                Assessment::Delivered
            } else {
                Assessment::Exceeded
            }
        }
        (Some(low), None) => {
            if actual >= low {
                Assessment::Delivered
            } else {
                Assessment::Missed
            }
        }
        // No usable floor to hold management to.
        _ => Assessment::Delivered,
    }
}

fn delta_pct(low: Option<f64>, high: Option<f64>, actual: f64) -> Option<f64> {
    let reference = match (low, high) {
        (Some(low), Some(high)) => (low + high) / 2.0,
        (Some(low), None) => low,
        (None, Some(high)) => high,
        (None, None) => return None,
    };
    if reference <= 0.0 {
        return None;
    }
    Some(((actual - reference) / reference * 100.0 * 100.0).round() / 100.0)
}

/// Settle one entry against an actual. Returns None when the entry is no
/// longer pending; the transition is one-shot and terminal.
pub fn reconcile(
    entry: &mut ScorecardEntry,
    actual: f64,
    actual_date: NaiveDate,
) -> Option<ScorecardOutcome> {
    if entry.assessment != Assessment::Pending {
        debug!(
            entry_id = entry.id,
            "scorecard entry already settled, skipping"
        );
        return None;
    }

    let assessment = classify(entry.promise_value_low, entry.promise_value_high, actual);
    entry.assessment = assessment;
    entry.actual_value = Some(actual);
    entry.actual_date = Some(actual_date);
    entry.delta_pct = delta_pct(entry.promise_value_low, entry.promise_value_high, actual);

    let label = match assessment {
        Assessment::Delivered => "DELIVERED",
        Assessment::Exceeded => "EXCEEDED",
        Assessment::Missed => "MISSED",
        Assessment::Pending => "PENDING",
    };

    Some(ScorecardOutcome {
        entry_id: entry.id,
        promise_text: entry.promise_text.clone(),
        assessment,
        actual_value: actual,
        delta_pct: entry.delta_pct,
        message: format!(
            "Scorecard: {} -> {} (actual: {})",
            entry.promise_text, label, actual
        ),
    })
}

/// Settle every pending entry that has a matching actual.
pub fn reconcile_pending(
    entries: &mut [ScorecardEntry],
    actuals: &HashMap<String, f64>,
    actual_date: NaiveDate,
) -> Vec<ScorecardOutcome> {
    let mut outcomes = Vec::new();
    for entry in entries.iter_mut() {
        if entry.assessment != Assessment::Pending {
            continue;
        }
        if let Some(actual) = actuals.get(&entry.promise_metric) {
            if let Some(outcome) = reconcile(entry, *actual, actual_date) {
                outcomes.push(outcome);
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promise_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    fn result_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    }

    fn capex_promise() -> ScorecardEntry {
        ScorecardEntry::new(
            1,
            "Hold FY2025 capex to $1.4-1.5B",
            "capex",
            Some(1400.0),
            Some(1500.0),
            promise_date(),
        )
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(classify(Some(1400.0), Some(1500.0), 1400.0), Assessment::Delivered);
        assert_eq!(classify(Some(1400.0), Some(1500.0), 1500.0), Assessment::Delivered);
        assert_eq!(classify(Some(1400.0), Some(1500.0), 1550.0), Assessment::Exceeded);
        assert_eq!(classify(Some(1400.0), Some(1500.0), 1390.0), Assessment::Missed);
    }

    #[test]
    fn single_lower_bound() {
        assert_eq!(classify(Some(800.0), None, 800.0), Assessment::Delivered);
        assert_eq!(classify(Some(800.0), None, 799.0), Assessment::Missed);
    }

    #[test]
    fn reconcile_stamps_actuals_and_delta() {
        let mut entry = capex_promise();
        let outcome = reconcile(&mut entry, 1480.0, result_date()).unwrap();

        assert_eq!(outcome.assessment, Assessment::Delivered);
        // Midpoint 1450: (1480 - 1450) / 1450 = 2.07%
        assert_eq!(outcome.delta_pct, Some(2.07));
        assert_eq!(entry.actual_value, Some(1480.0));
        assert_eq!(entry.actual_date, Some(result_date()));
        assert!(outcome.message.contains("DELIVERED"));
    }

    #[test]
    fn settled_entries_are_never_reevaluated() {
        let mut entry = capex_promise();
        reconcile(&mut entry, 1550.0, result_date()).unwrap();
        assert_eq!(entry.assessment, Assessment::Exceeded);

        // A later, different actual must not change the verdict.
        let again = reconcile(&mut entry, 1400.0, result_date());
        assert!(again.is_none());
        assert_eq!(entry.assessment, Assessment::Exceeded);
        assert_eq!(entry.actual_value, Some(1550.0));
    }

    #[test]
    fn reconcile_pending_matches_by_metric() {
        let mut entries = vec![
            capex_promise(),
            ScorecardEntry::new(
                2,
                "Reduce net debt by $300M",
                "debt_reduction",
                Some(300.0),
                None,
                promise_date(),
            ),
        ];
        let mut actuals = HashMap::new();
        actuals.insert("capex".to_string(), 1390.0);

        let outcomes = reconcile_pending(&mut entries, &actuals, result_date());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].assessment, Assessment::Missed);
        // No debt_reduction actual: still pending.
        assert_eq!(entries[1].assessment, Assessment::Pending);
    }
}
