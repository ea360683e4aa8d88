use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::error::{GatewayError, Result};

/// Content prefix returned for every completion when no model is loaded.
pub const MOCK_RESPONSE_PREFIX: &str = "⚠️ Mock Response (Model not loaded). You said: ";

/// Buffered deltas between the generation thread and the HTTP response.
/// Small on purpose: a slow consumer must throttle the token loop.
const STREAM_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation message. Ordering within a request is meaningful
/// and preserved all the way into the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
}

/// Sampling parameters handed to the runtime. Every request field left null
/// is resolved against these defaults before the runtime sees it, so behavior
/// is consistent across requests regardless of the runtime's own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub max_tokens: Option<usize>,
    pub repeat_penalty: f32,
    pub stop: Vec<String>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            top_k: 40,
            max_tokens: None,
            repeat_penalty: 1.1,
            stop: vec![],
        }
    }
}

/// Full output of a blocking completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub finish_reason: FinishReason,
}

/// One incremental update of a streaming completion: a role announcement,
/// a content fragment, or the terminal finish marker.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionDelta {
    pub role: Option<Role>,
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl CompletionDelta {
    /// First delta of every stream: announces the assistant role with empty
    /// content.
    pub fn role() -> Self {
        Self {
            role: Some(Role::Assistant),
            content: Some(String::new()),
            finish_reason: None,
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            role: None,
            content: Some(text.into()),
            finish_reason: None,
        }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self {
            role: None,
            content: None,
            finish_reason: Some(reason),
        }
    }
}

/// The loaded model runtime, treated as an opaque capability. Implementations
/// are not safe for parallel invocation; the engine serializes all calls.
///
/// The streaming callback receives decoded text fragments and returns `false`
/// to abort generation early.
pub trait ChatRuntime: Send {
    fn generate(
        &mut self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<CompletionResult>;

    fn generate_stream(
        &mut self,
        messages: &[ChatMessage],
        params: &SamplingParams,
        on_fragment: &mut dyn FnMut(&str) -> bool,
    ) -> Result<CompletionResult>;
}

/// Process-wide inference engine, constructed once at startup and never
/// swapped while serving. Either a loaded runtime behind a mutex, or the
/// deterministic mock fallback.
pub enum Engine {
    Loaded {
        runtime: Arc<Mutex<Box<dyn ChatRuntime>>>,
    },
    Mock,
}

impl Engine {
    pub fn loaded(runtime: Box<dyn ChatRuntime>) -> Self {
        Self::Loaded {
            runtime: Arc::new(Mutex::new(runtime)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// Run a blocking completion. Loaded runtimes execute on a blocking
    /// thread under the runtime mutex so concurrent requests queue instead
    /// of interleaving inside the model.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        params: SamplingParams,
    ) -> Result<CompletionResult> {
        match self {
            Self::Loaded { runtime } => {
                let runtime = Arc::clone(runtime);
                tokio::task::spawn_blocking(move || {
                    let mut runtime = runtime.blocking_lock();
                    runtime.generate(&messages, &params)
                })
                .await
                .map_err(|e| GatewayError::Inference(format!("inference task failed: {e}")))?
            }
            Self::Mock => Ok(mock_result(&messages)),
        }
    }

    /// Start a streaming completion and return the delta receiver. The first
    /// delta announces the role, content fragments follow, and a finish delta
    /// terminates the stream.
    ///
    /// Loaded runtimes hold the mutex for the whole stream. The channel is
    /// bounded, so a slow consumer backpressures the token loop, and a dropped
    /// receiver (client disconnect) aborts generation on the next fragment.
    /// If the runtime errors mid-stream the channel simply closes: the caller
    /// gets the fragments produced so far and no finish delta.
    pub fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
        params: SamplingParams,
    ) -> mpsc::Receiver<CompletionDelta> {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        match self {
            Self::Loaded { runtime } => {
                let runtime = Arc::clone(runtime);
                tokio::task::spawn_blocking(move || {
                    let mut runtime = runtime.blocking_lock();

                    if tx.blocking_send(CompletionDelta::role()).is_err() {
                        debug!("stream client gone before generation started");
                        return;
                    }

                    let outcome =
                        runtime.generate_stream(&messages, &params, &mut |fragment| {
                            tx.blocking_send(CompletionDelta::content(fragment)).is_ok()
                        });

                    match outcome {
                        Ok(result) => {
                            let _ = tx.blocking_send(CompletionDelta::finish(result.finish_reason));
                            info!(
                                "stream finished: {} completion tokens",
                                result.completion_tokens
                            );
                        }
                        Err(e) => {
                            // Truncate the stream; the SSE encoder still closes
                            // it with the terminal sentinel.
                            error!("generation failed mid-stream: {e}");
                        }
                    }
                });
            }
            Self::Mock => {
                let result = mock_result(&messages);
                let _ = tx.try_send(CompletionDelta::role());
                let _ = tx.try_send(CompletionDelta::content(result.content));
                let _ = tx.try_send(CompletionDelta::finish(FinishReason::Stop));
            }
        }

        rx
    }
}

fn mock_result(messages: &[ChatMessage]) -> CompletionResult {
    let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
    CompletionResult {
        content: format!("{MOCK_RESPONSE_PREFIX}{last}"),
        prompt_tokens: 0,
        completion_tokens: 0,
        finish_reason: FinishReason::Stop,
    }
}
