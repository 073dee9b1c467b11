use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use crate::config::ConfigSnapshot;

/// `GET /admin/config` -- returns the effective server configuration.
///
/// The upload directory is left out so the response does not reveal the
/// host filesystem layout.
#[allow(clippy::unused_async)]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json::<ConfigSnapshot>(state.config.clone()))
}
