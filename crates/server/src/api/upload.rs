use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;

use super::AppState;
use super::schemas::UploadResponse;
use crate::error::ServerError;
use crate::ingress::IngressError;

/// `POST /api/upload` -- store one video and return its share link.
///
/// The body must be `multipart/form-data` with exactly one file field named
/// `video`. Other text fields are ignored.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Upload",
    summary = "Upload a video",
    description = "Stores a single video file sent as the `video` multipart field and returns a time-limited share link.",
    request_body(content = String, content_type = "multipart/form-data", description = "Form with a `video` file field"),
    responses(
        (status = 200, description = "Video stored", body = UploadResponse),
        (status = 400, description = "Missing file, wrong media type or malformed request", body = super::schemas::ErrorResponse),
        (status = 413, description = "File exceeds the size ceiling", body = super::schemas::ErrorResponse),
        (status = 500, description = "Storage failure", body = super::schemas::ErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ServerError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let outcome = async {
        state.ingress.check_content_length(declared)?;
        let multipart = multipart.map_err(|e| IngressError::InvalidInput(e.body_text()))?;
        state.ingress.accept(multipart).await
    }
    .await;

    match outcome {
        Ok(receipt) => {
            state.metrics.increment_uploads_accepted(receipt.size_bytes);
            Ok(Json(UploadResponse::from(receipt)))
        }
        Err(e) => {
            if matches!(e, IngressError::Storage(_)) {
                state.metrics.increment_uploads_failed();
            } else {
                tracing::debug!(error = %e, "upload rejected");
                state.metrics.increment_uploads_rejected();
            }
            Err(e.into())
        }
    }
}
