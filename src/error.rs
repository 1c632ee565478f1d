use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures of the outbound conversation call. None of them are retried.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("relay response parse error: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to render relay template: {0}")]
    Template(#[from] minijinja::Error),
}

/// Errors that end a capture request with something other than the
/// acknowledgment.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("request body is neither JSON, form data nor UTF-8 text")]
    InvalidEncoding(#[source] std::str::Utf8Error),

    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl IntoResponse for ListenerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidEncoding(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request body is not valid UTF-8 text",
            ),
            Self::Body(rejection) => return rejection.into_response(),
            Self::Relay(_) => (StatusCode::BAD_GATEWAY, "Relay request failed"),
        };

        (
            status,
            Json(serde_json::json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}
