//! Kill-criterion evaluation.
//!
//! A kill criterion is a hard exit threshold on a named metric. Evaluation
//! is a pure comparison between a stored threshold and an observed actual;
//! the orchestrator owns persisting the one-way untriggered -> triggered
//! transition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thesis_core::KillCriterion;
use tracing::warn;

/// Comparison operator stored on a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            ">=" => Some(Operator::Ge),
            "<=" => Some(Operator::Le),
            "=" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            _ => None,
        }
    }

    pub fn apply(&self, actual: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => actual > threshold,
            Operator::Lt => actual < threshold,
            Operator::Ge => actual >= threshold,
            Operator::Le => actual <= threshold,
            Operator::Eq => actual == threshold,
            Operator::Ne => actual != threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
        }
    }
}

/// Result of evaluating one criterion against the actuals on hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillCheck {
    pub criterion_id: u64,
    pub criterion: String,
    pub metric_name: String,
    pub threshold_value: Option<f64>,
    pub threshold_operator: Option<String>,
    pub actual_value: Option<f64>,
    pub triggered: bool,
    /// False when the stored operator string did not parse. The criterion
    /// is treated as non-triggering; callers surface a data-quality warning.
    pub operator_recognized: bool,
}

impl KillCheck {
    /// Evidence string persisted alongside a trigger.
    pub fn evidence(&self) -> Option<String> {
        self.actual_value
            .map(|v| format!("actual {}={}", self.metric_name, v))
    }
}

/// Evaluate a single criterion. Missing actual or threshold means
/// untriggered, never an error.
pub fn evaluate(criterion: &KillCriterion, actual: Option<f64>) -> KillCheck {
    let mut triggered = false;
    let mut operator_recognized = true;

    if let (Some(actual), Some(threshold)) = (actual, criterion.threshold_value) {
        match criterion.threshold_operator.as_deref().map(Operator::parse) {
            Some(Some(op)) => triggered = op.apply(actual, threshold),
            Some(None) => {
                operator_recognized = false;
                warn!(
                    criterion_id = criterion.id,
                    metric = %criterion.metric_name,
                    operator = ?criterion.threshold_operator,
                    "unrecognized kill-criterion operator, treating as non-triggering"
                );
            }
            None => {}
        }
    }

    KillCheck {
        criterion_id: criterion.id,
        criterion: criterion.criterion.clone(),
        metric_name: criterion.metric_name.clone(),
        threshold_value: criterion.threshold_value,
        threshold_operator: criterion.threshold_operator.clone(),
        actual_value: actual,
        triggered,
        operator_recognized,
    }
}

/// Evaluate every criterion against a map of observed actuals.
pub fn check_all(criteria: &[KillCriterion], actuals: &HashMap<String, f64>) -> Vec<KillCheck> {
    criteria
        .iter()
        .map(|c| evaluate(c, actuals.get(&c.metric_name).copied()))
        .collect()
}
