//! HTTP client for the external evidence-interpretation service.
//!
//! The service reads new data against open hypotheses and suggests status
//! and confidence updates. Its output is free-text-derived JSON and is
//! treated as untrusted: the hypothesis tracker re-validates every field
//! before anything mutates.

pub mod client;
pub mod error;

pub use client::{ReasoningClient, ReasoningConfig};
pub use error::{InterpreterError, InterpreterResult};
