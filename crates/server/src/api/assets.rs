use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::AppState;
use super::schemas::DownloadParams;
use crate::error::ServerError;

/// `GET /uploads/{name}` -- raw video bytes.
///
/// `name` is either the bare id or the stored `<id>.<ext>` file name.
/// Byte ranges and conditional requests are honoured.
#[utoipa::path(
    get,
    path = "/uploads/{name}",
    tag = "Share",
    summary = "Raw video",
    params(
        ("name" = String, Path, description = "Asset id or stored file name"),
        DownloadParams
    ),
    responses(
        (status = 200, description = "Full content"),
        (status = 206, description = "Requested byte range"),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Expired or never existed", body = super::schemas::ErrorResponse),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn raw(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<DownloadParams>,
    request: Request,
) -> Result<Response, ServerError> {
    let Some(asset) = state.resolver.resolve(&name).await?.present() else {
        state.metrics.increment_lookups_absent();
        return Err(ServerError::NotFound);
    };

    let Ok(response) = ServeFile::new(&asset.path).oneshot(request).await;
    let mut response = response.map(Body::new);

    match response.status() {
        // Reaped between the lookup and the open.
        StatusCode::NOT_FOUND => {
            state.metrics.increment_lookups_absent();
            return Err(ServerError::NotFound);
        }
        StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
            state.metrics.increment_downloads_served();
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(asset.media_type));
            if params.wants_attachment() {
                let disposition = format!("attachment; filename=\"{}\"", asset.file_name);
                if let Ok(value) = HeaderValue::from_str(&disposition) {
                    headers.insert(CONTENT_DISPOSITION, value);
                }
            }
        }
        _ => {}
    }

    Ok(response)
}
