use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use ephemera_blob::ReaperMetricsSnapshot;

use super::AppState;
use super::schemas::{HealthResponse, ReaperStatusResponse};

/// `GET /health` -- returns service status together with reaper and request
/// counters.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    description = "Returns service status, the expiry reaper state and a snapshot of request counters.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(clippy::unused_async)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let reaper = match &state.reaper {
        Some(metrics) => ReaperStatusResponse::new(true, &metrics.snapshot()),
        None => ReaperStatusResponse::new(false, &ReaperMetricsSnapshot::default()),
    };

    let body = HealthResponse {
        status: "ok".into(),
        ttl_seconds: state.resolver.ttl().as_secs(),
        reaper,
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(body))
}
