//! Hypothesis evidence tracking.
//!
//! Owns the hypothesis state machine: active -> strengthened | weakened
//! (re-enterable) -> disproved (terminal). Evidence interpretation is
//! delegated to an external reasoning service whose output is untrusted:
//! everything it returns is re-validated here before any state changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thesis_core::{
    EvidenceDirection, EvidenceEntry, Hypothesis, HypothesisStatus, InterpretationResponse,
};
use tracing::warn;

/// Minimum confidence move required to justify a status change.
pub const MIN_STATUS_CHANGE_DELTA: f64 = 5.0;

/// An interpreter update that survived validation: the hypothesis resolves
/// and is open, the status is a known state, confidence is clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedUpdate {
    pub hypothesis_id: u64,
    pub direction: EvidenceDirection,
    pub evidence: String,
    pub new_status: HypothesisStatus,
    pub new_confidence: f64,
}

/// What applying one update did to a hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisChange {
    pub hypothesis_id: u64,
    pub old_status: HypothesisStatus,
    pub new_status: HypothesisStatus,
    pub confidence: f64,
    pub status_changed: bool,
    pub evidence: String,
}

impl HypothesisChange {
    pub fn message(&self) -> String {
        format!(
            "Hypothesis #{} {} ({}%): {}",
            self.hypothesis_id,
            self.new_status.as_str().to_uppercase(),
            self.confidence,
            self.evidence
        )
    }
}

/// Filter raw interpreter output down to applicable updates. Entries with
/// an unresolvable or closed hypothesis, or an unknown status, are dropped
/// with a warning; confidence is clamped to [0, 100]; an unknown direction
/// falls back to "for".
pub fn validate_updates(
    response: &InterpretationResponse,
    hypotheses: &[Hypothesis],
) -> Vec<ValidatedUpdate> {
    let mut validated = Vec::new();

    for raw in &response.updates {
        let hypothesis = match hypotheses.iter().find(|h| h.id == raw.hypothesis_id) {
            Some(h) => h,
            None => {
                warn!(
                    hypothesis_id = raw.hypothesis_id,
                    "interpreter referenced unknown hypothesis, discarding update"
                );
                continue;
            }
        };
        if !hypothesis.is_open() {
            warn!(
                hypothesis_id = raw.hypothesis_id,
                "interpreter targeted a disproved hypothesis, discarding update"
            );
            continue;
        }

        let new_status = match HypothesisStatus::parse(&raw.new_status) {
            Some(s) => s,
            None => {
                warn!(
                    hypothesis_id = raw.hypothesis_id,
                    status = %raw.new_status,
                    "interpreter returned unknown status, discarding update"
                );
                continue;
            }
        };

        let direction = EvidenceDirection::parse(&raw.direction).unwrap_or_else(|| {
            warn!(
                hypothesis_id = raw.hypothesis_id,
                direction = %raw.direction,
                "interpreter returned unknown direction, defaulting to 'for'"
            );
            EvidenceDirection::For
        });

        let clamped = raw.new_confidence.clamp(0.0, 100.0);
        if clamped != raw.new_confidence {
            warn!(
                hypothesis_id = raw.hypothesis_id,
                confidence = raw.new_confidence,
                "interpreter confidence outside [0, 100], clamping"
            );
        }

        validated.push(ValidatedUpdate {
            hypothesis_id: raw.hypothesis_id,
            direction,
            evidence: raw.evidence.clone(),
            new_status,
            new_confidence: clamped,
        });
    }

    validated
}

/// Apply one validated update. The evidence entry is appended
/// unconditionally; a status change is only honored when the confidence
/// moved by at least [`MIN_STATUS_CHANGE_DELTA`] points. Returns None for
/// closed hypotheses.
pub fn apply_update(
    hypothesis: &mut Hypothesis,
    update: &ValidatedUpdate,
    source_type: &str,
    source_ref: Option<String>,
    source_date: NaiveDate,
) -> Option<HypothesisChange> {
    if !hypothesis.is_open() {
        return None;
    }

    hypothesis.evidence_log.push(EvidenceEntry {
        direction: update.direction,
        evidence: update.evidence.clone(),
        source_type: source_type.to_string(),
        source_ref,
        source_date,
    });

    let old_status = hypothesis.status;

    // "active" from the interpreter means "no status change".
    let wants_change =
        update.new_status != HypothesisStatus::Active && update.new_status != old_status;

    if wants_change {
        let delta = (update.new_confidence - hypothesis.confidence).abs();
        if delta < MIN_STATUS_CHANGE_DELTA {
            warn!(
                hypothesis_id = hypothesis.id,
                delta,
                "status change without a {MIN_STATUS_CHANGE_DELTA}-point confidence move, rejecting"
            );
        } else {
            hypothesis.status = update.new_status;
            hypothesis.confidence = update.new_confidence;
        }
    } else if update.new_status == old_status && update.new_status != HypothesisStatus::Active {
        // Re-entering the same state just refreshes confidence.
        hypothesis.confidence = update.new_confidence;
    }

    Some(HypothesisChange {
        hypothesis_id: hypothesis.id,
        old_status,
        new_status: hypothesis.status,
        confidence: hypothesis.confidence,
        status_changed: hypothesis.status != old_status,
        evidence: update.evidence.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_core::RawEvidenceUpdate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    }

    fn hypothesis() -> Hypothesis {
        Hypothesis::new(
            1,
            "Hedge book shields FY2026 cash flow from sub-$3 gas",
            "Unhedged volumes force capex cuts at sub-$3 gas",
            50.0,
        )
    }

    fn raw(id: u64, status: &str, confidence: f64) -> RawEvidenceUpdate {
        RawEvidenceUpdate {
            hypothesis_id: id,
            direction: "for".to_string(),
            evidence: "Q3 hedge book extended through 2026".to_string(),
            new_status: status.to_string(),
            new_confidence: confidence,
        }
    }

    fn update(status: HypothesisStatus, confidence: f64) -> ValidatedUpdate {
        ValidatedUpdate {
            hypothesis_id: 1,
            direction: EvidenceDirection::For,
            evidence: "Q3 hedge book extended through 2026".to_string(),
            new_status: status,
            new_confidence: confidence,
        }
    }

    #[test]
    fn status_change_with_sufficient_delta() {
        let mut h = hypothesis();
        let change =
            apply_update(&mut h, &update(HypothesisStatus::Strengthened, 65.0), "filing", None, date())
                .unwrap();

        assert!(change.status_changed);
        assert_eq!(h.status, HypothesisStatus::Strengthened);
        assert_eq!(h.confidence, 65.0);
        assert_eq!(h.evidence_log.len(), 1);
    }

    #[test]
    fn small_delta_rejects_status_change_but_logs_evidence() {
        let mut h = hypothesis();
        let change =
            apply_update(&mut h, &update(HypothesisStatus::Weakened, 52.0), "filing", None, date())
                .unwrap();

        assert!(!change.status_changed);
        assert_eq!(h.status, HypothesisStatus::Active);
        assert_eq!(h.confidence, 50.0);
        // The observation itself is still kept.
        assert_eq!(h.evidence_log.len(), 1);
    }

    #[test]
    fn active_means_no_change() {
        let mut h = hypothesis();
        let change = apply_update(&mut h, &update(HypothesisStatus::Active, 90.0), "filing", None, date())
            .unwrap();

        assert!(!change.status_changed);
        assert_eq!(h.confidence, 50.0);
        assert_eq!(h.evidence_log.len(), 1);
    }

    #[test]
    fn reentering_a_state_refreshes_confidence() {
        let mut h = hypothesis();
        apply_update(&mut h, &update(HypothesisStatus::Strengthened, 65.0), "filing", None, date());
        // Same state again with a small move: confidence still updates.
        apply_update(&mut h, &update(HypothesisStatus::Strengthened, 67.0), "filing", None, date());

        assert_eq!(h.status, HypothesisStatus::Strengthened);
        assert_eq!(h.confidence, 67.0);
        assert_eq!(h.evidence_log.len(), 2);
    }

    #[test]
    fn disproved_is_terminal() {
        let mut h = hypothesis();
        apply_update(&mut h, &update(HypothesisStatus::Disproved, 10.0), "filing", None, date());
        assert_eq!(h.status, HypothesisStatus::Disproved);

        let change = apply_update(&mut h, &update(HypothesisStatus::Strengthened, 80.0), "filing", None, date());
        assert!(change.is_none());
        assert_eq!(h.status, HypothesisStatus::Disproved);
        assert_eq!(h.evidence_log.len(), 1);
    }

    #[test]
    fn validation_clamps_confidence() {
        let hypotheses = vec![hypothesis()];
        let response = InterpretationResponse {
            updates: vec![raw(1, "strengthened", 105.0), raw(1, "weakened", -10.0)],
            summary: None,
        };

        let validated = validate_updates(&response, &hypotheses);
        assert_eq!(validated[0].new_confidence, 100.0);
        assert_eq!(validated[1].new_confidence, 0.0);
    }

    #[test]
    fn validation_discards_bad_entries() {
        let mut closed = hypothesis();
        closed.id = 2;
        closed.status = HypothesisStatus::Disproved;
        let hypotheses = vec![hypothesis(), closed];

        let response = InterpretationResponse {
            updates: vec![
                raw(99, "strengthened", 60.0), // unknown hypothesis
                raw(2, "strengthened", 60.0),  // disproved hypothesis
                raw(1, "vindicated", 60.0),    // unknown status
                raw(1, "strengthened", 60.0),  // valid
            ],
            summary: None,
        };

        let validated = validate_updates(&response, &hypotheses);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].hypothesis_id, 1);
        assert_eq!(validated[0].new_status, HypothesisStatus::Strengthened);
    }

    #[test]
    fn unknown_direction_defaults_to_for() {
        let hypotheses = vec![hypothesis()];
        let mut bad_direction = raw(1, "strengthened", 60.0);
        bad_direction.direction = "sideways".to_string();
        let response = InterpretationResponse {
            updates: vec![bad_direction],
            summary: None,
        };

        let validated = validate_updates(&response, &hypotheses);
        assert_eq!(validated[0].direction, EvidenceDirection::For);
    }
}
