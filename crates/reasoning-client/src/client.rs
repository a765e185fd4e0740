use crate::error::{InterpreterError, InterpreterResult};
use async_trait::async_trait;
use std::time::Duration;
use thesis_core::{EngineError, EvidenceInterpreter, InterpretationRequest, InterpretationResponse};
use tracing::debug;

/// Configuration for the reasoning service connection.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("REASONING_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8010".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the evidence-interpretation endpoint.
#[derive(Clone)]
pub struct ReasoningClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReasoningClient {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: config.base_url,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ReasoningConfig::default())
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Ask the service to read new data against open hypotheses.
    pub async fn interpret_evidence(
        &self,
        request: &InterpretationRequest,
    ) -> InterpreterResult<InterpretationResponse> {
        let url = format!("{}/interpret-evidence", self.base_url);
        debug!(
            hypotheses = request.hypotheses.len(),
            new_metrics = request.new_data.new_metrics.len(),
            "requesting evidence interpretation"
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| InterpreterError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InterpreterError::ServiceUnavailable(format!(
                "Reasoning service returned {}",
                response.status()
            )));
        }

        response
            .json::<InterpretationResponse>()
            .await
            .map_err(|e| InterpreterError::InvalidResponse(e.to_string()))
    }

    pub async fn health(&self) -> InterpreterResult<bool> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl EvidenceInterpreter for ReasoningClient {
    async fn interpret(
        &self,
        request: &InterpretationRequest,
    ) -> Result<InterpretationResponse, EngineError> {
        self.interpret_evidence(request)
            .await
            .map_err(|e| EngineError::ExternalService(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_core::{NewDataDigest, RawEvidenceUpdate};

    #[test]
    fn request_serializes_with_expected_shape() {
        let request = InterpretationRequest {
            thesis_summary: "Hedged gas producer survives the strip".to_string(),
            hypotheses: vec![],
            new_data: NewDataDigest::default(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("thesis_summary").is_some());
        assert!(value.get("hypotheses").is_some());
        assert!(value["new_data"].get("new_metrics").is_some());
    }

    #[test]
    fn response_tolerates_missing_fields() {
        // An empty object is a valid "nothing relevant" response.
        let response: InterpretationResponse = serde_json::from_str("{}").unwrap();
        assert!(response.updates.is_empty());
        assert!(response.summary.is_none());

        let response: InterpretationResponse = serde_json::from_str(
            r#"{"updates":[{"hypothesis_id":1,"direction":"for","evidence":"x","new_status":"strengthened","new_confidence":65.0}],"summary":"ok"}"#,
        )
        .unwrap();
        let RawEvidenceUpdate { new_confidence, .. } = response.updates[0].clone();
        assert_eq!(new_confidence, 65.0);
    }
}
