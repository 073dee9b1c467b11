use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use ephemera_blob::BlobError;

use crate::ingress::IngressError;
use crate::render::RenderError;

/// Errors that can occur when running the Ephemera server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed or carried the wrong content.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The upload exceeded the size ceiling.
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// The asset does not exist or has expired.
    #[error("asset not found")]
    NotFound,

    /// The blob store failed.
    #[error("storage error: {0}")]
    Storage(#[from] BlobError),

    /// A page could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

impl From<IngressError> for ServerError {
    fn from(err: IngressError) -> Self {
        match err {
            IngressError::TooLarge { limit } => Self::PayloadTooLarge { limit },
            IngressError::Storage(e) => Self::Storage(e),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl ServerError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Io(_) | Self::Storage(_) | Self::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::PayloadTooLarge { limit } => {
                format!("file too large: the limit is {limit} bytes")
            }
            Self::NotFound => "this video has expired or never existed".to_owned(),
            // Internal details (paths, OS messages) stay in the log.
            Self::Config(_) | Self::Io(_) | Self::Storage(_) | Self::Render(_) => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_owned()
            }
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
