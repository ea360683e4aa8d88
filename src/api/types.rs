use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::{ChatMessage, CompletionDelta, CompletionResult, FinishReason, SamplingParams};
use crate::error::{GatewayError, Result};

/// Response id used for every mock-mode completion.
pub const MOCK_COMPLETION_ID: &str = "chatcmpl-mock";

/// OpenAI-compatible chat completion request.
///
/// Unknown fields are ignored for forward compatibility. Sampling fields are
/// optional here and resolved against [`SamplingParams::default`] per call,
/// so the runtime always sees fully-specified parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<usize>,
    pub n: Option<usize>,
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub stream: bool,
    pub stop: Option<StopSequences>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub logit_bias: Option<HashMap<String, f64>>,
    pub user: Option<String>,
    pub repeat_penalty: Option<f32>,
}

/// `stop` accepts either a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

impl ChatCompletionRequest {
    /// Checks the invariants serde cannot express. Runs before dispatch, so
    /// an invalid request never reaches the engine.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(GatewayError::Validation(
                "messages must contain at least one element".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the optional sampling fields against the engine defaults.
    pub fn sampling_params(&self) -> SamplingParams {
        let defaults = SamplingParams::default();
        SamplingParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            max_tokens: self.max_tokens,
            repeat_penalty: self.repeat_penalty.unwrap_or(defaults.repeat_penalty),
            stop: self
                .stop
                .clone()
                .map(StopSequences::into_vec)
                .unwrap_or_default(),
        }
    }
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl ChatCompletionResponse {
    /// Wrap a completion result into a response with a single choice.
    ///
    /// The engine is not multi-sample aware: `n > 1` is accepted on the
    /// request but only one choice is ever produced.
    pub fn from_result(id: String, created: u64, model: String, result: CompletionResult) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created,
            model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: crate::engine::Role::Assistant,
                    content: result.content,
                },
                finish_reason: Some(result.finish_reason),
            }],
            usage: Usage::new(result.prompt_tokens, result.completion_tokens),
        }
    }
}

/// Streaming response chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    pub index: usize,
    pub delta: Delta,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<crate::engine::Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    pub fn from_delta(id: String, created: u64, model: String, delta: CompletionDelta) -> Self {
        Self {
            id,
            object: "chat.completion.chunk".to_string(),
            created,
            model,
            choices: vec![ChunkChoice {
                index: 0,
                delta: Delta {
                    role: delta.role,
                    content: delta.content,
                },
                finish_reason: delta.finish_reason,
            }],
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::Role;

    #[test]
    fn minimal_request_parses_with_defaults() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "x",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert!(!request.stream);
        assert_eq!(request.messages[0].role, Role::User);

        let params = request.sampling_params();
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.top_p, 1.0);
        assert_eq!(params.top_k, 40);
        assert_eq!(params.repeat_penalty, 1.1);
        assert_eq!(params.max_tokens, None);
        assert!(params.stop.is_empty());
    }

    #[test]
    fn explicit_sampling_fields_override_defaults() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "x",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.1,
            "top_k": 5,
            "max_tokens": 128
        }))
        .unwrap();

        let params = request.sampling_params();
        assert_eq!(params.temperature, 0.1);
        assert_eq!(params.top_k, 5);
        assert_eq!(params.max_tokens, Some(128));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "x",
            "messages": [{"role": "user", "content": "hi"}],
            "some_future_field": {"nested": true}
        }))
        .unwrap();
        assert_eq!(request.model, "x");
    }

    #[test]
    fn missing_model_is_rejected() {
        let result: serde_json::Result<ChatCompletionRequest> = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_temperature_is_rejected() {
        let result: serde_json::Result<ChatCompletionRequest> = serde_json::from_value(json!({
            "model": "x",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": "hot"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_messages_fail_validation() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "x",
            "messages": []
        }))
        .unwrap();
        assert!(matches!(
            request.validate(),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn stop_accepts_string_or_array() {
        let one: StopSequences = serde_json::from_value(json!("</s>")).unwrap();
        assert_eq!(one.into_vec(), vec!["</s>"]);

        let many: StopSequences = serde_json::from_value(json!(["</s>", "\n\n"])).unwrap();
        assert_eq!(many.into_vec(), vec!["</s>", "\n\n"]);
    }

    #[test]
    fn usage_total_is_sum_of_parts() {
        let usage = Usage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn response_from_result_has_single_choice() {
        let response = ChatCompletionResponse::from_result(
            "chatcmpl-test".to_string(),
            1700000000,
            "x".to_string(),
            CompletionResult {
                content: "hello".to_string(),
                prompt_tokens: 4,
                completion_tokens: 1,
                finish_reason: FinishReason::Stop,
            },
        );

        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "hello");
        assert_eq!(response.usage.total_tokens, 5);
    }

    #[test]
    fn chunk_serialization_omits_absent_delta_fields() {
        let role_chunk = ChatCompletionChunk::from_delta(
            "chatcmpl-test".to_string(),
            1700000000,
            "x".to_string(),
            CompletionDelta::role(),
        );
        let value = serde_json::to_value(&role_chunk).unwrap();
        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(value["choices"][0]["delta"]["content"], "");
        assert_eq!(value["choices"][0]["finish_reason"], serde_json::Value::Null);

        let finish_chunk = ChatCompletionChunk::from_delta(
            "chatcmpl-test".to_string(),
            1700000000,
            "x".to_string(),
            CompletionDelta::finish(FinishReason::Length),
        );
        let value = serde_json::to_value(&finish_chunk).unwrap();
        assert_eq!(value["choices"][0]["finish_reason"], "length");
        let delta = value["choices"][0]["delta"].as_object().unwrap();
        assert!(delta.is_empty());
    }
}
