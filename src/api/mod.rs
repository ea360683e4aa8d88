pub mod routes;
pub mod types;

pub use routes::create_router;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::engine::Engine;
use crate::error::GatewayError;
use types::{ErrorDetail, ErrorResponse};

/// Shared application state. The engine variant is fixed at startup and
/// read-only while serving.
pub struct AppState {
    pub engine: Engine,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorDetail {
                    message: self.to_string(),
                    r#type: kind.to_string(),
                    code: None,
                },
            }),
        )
            .into_response()
    }
}
