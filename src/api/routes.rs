use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::types::*;
use super::AppState;
use crate::error::GatewayError;
use crate::sse;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_loaded = state.engine.is_loaded();
    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "mock_mode" }.to_string(),
        model_loaded,
    })
}

async fn chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // Parsed by hand rather than through the Json extractor so schema
    // failures map to a 400 with an OpenAI-shaped error body.
    let request: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return GatewayError::Validation(e.to_string()).into_response(),
    };
    if let Err(e) = request.validate() {
        return e.into_response();
    }

    info!(
        "chat completion request: {} messages, stream={}",
        request.messages.len(),
        request.stream
    );
    if request.n.unwrap_or(1) > 1 {
        warn!("n > 1 requested; only a single choice is generated");
    }

    let request_id = if state.engine.is_loaded() {
        format!("chatcmpl-{}", Uuid::new_v4())
    } else {
        MOCK_COMPLETION_ID.to_string()
    };
    let created = unix_timestamp();
    let params = request.sampling_params();

    if request.stream {
        let rx = state.engine.complete_stream(request.messages, params);
        let model = request.model;
        let chunks = ReceiverStream::new(rx).map(move |delta| {
            ChatCompletionChunk::from_delta(request_id.clone(), created, model.clone(), delta)
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from_stream(sse::encode(chunks)))
            .unwrap()
            .into_response()
    } else {
        match state.engine.complete(request.messages, params).await {
            Ok(result) => Json(ChatCompletionResponse::from_result(
                request_id,
                created,
                request.model,
                result,
            ))
            .into_response(),
            Err(e) => {
                error!("generation error: {e}");
                e.into_response()
            }
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
