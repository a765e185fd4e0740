//! Deterministic financial model for E&P companies.
//!
//! All arithmetic lives here. The reasoning service never computes these
//! values; it only consumes them. Every accessor returns `None` when its
//! required inputs are absent; missing data is a value, not an error and
//! never a zero.

pub mod model;
pub mod params;

pub use model::{FinancialModel, FundingGapCoverage, ModelSummary};
pub use params::ModelParameters;
