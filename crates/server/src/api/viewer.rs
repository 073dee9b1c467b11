use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::AppState;
use crate::error::ServerError;
use crate::resolver::Resolution;

/// `GET /v/{id}` -- share page with an embedded player.
///
/// Unknown, malformed and expired ids all get the same 404 page.
#[utoipa::path(
    get,
    path = "/v/{id}",
    tag = "Share",
    summary = "Share page",
    params(("id" = String, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Player page", body = String, content_type = "text/html"),
        (status = 404, description = "Expired or never existed", body = String, content_type = "text/html")
    )
)]
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    match state.resolver.resolve(&id).await? {
        Resolution::Present(asset) => {
            let html = state.renderer.render_asset(&asset)?;
            state.metrics.increment_views_served();
            Ok(Html(html).into_response())
        }
        Resolution::Absent => {
            let html = state.renderer.render_expired()?;
            state.metrics.increment_lookups_absent();
            Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
        }
    }
}
