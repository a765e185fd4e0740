use crate::{EngineError, InterpretationRequest, InterpretationResponse};
use async_trait::async_trait;

/// Seam to the external reasoning service that interprets new evidence
/// against open hypotheses.
///
/// Implementations may be remote and slow; callers bound the call with a
/// timeout and treat any failure as "no evidence this cycle". The response
/// is untrusted input and is re-validated by the hypothesis tracker.
#[async_trait]
pub trait EvidenceInterpreter: Send + Sync {
    async fn interpret(
        &self,
        request: &InterpretationRequest,
    ) -> Result<InterpretationResponse, EngineError>;
}
