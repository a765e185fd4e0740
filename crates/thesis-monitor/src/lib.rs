//! Monitoring orchestrator.
//!
//! Drives the per-thesis check cycle: kill criteria, scorecard, guidance
//! revisions, then delegated evidence interpretation. Silence is the
//! default: with no new data the cycle does nothing at all.

pub mod monitor;
pub mod thesis;

pub use monitor::{Alert, AlertKind, CycleOutcome, ThesisMonitor};
pub use thesis::{NewData, Thesis};
