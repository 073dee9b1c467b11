use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use ephemera_blob::ReaperMetricsSnapshot;

use crate::ingress::UploadReceipt;
use crate::metrics::ServerMetricsSnapshot;

/// Successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Share link path.
    #[schema(example = "/v/0b6f3c2e-8f61-4d0f-9a2c-5be0f3f7a9d1")]
    pub url: String,
    /// Stored file name, also accepted by `/uploads/{name}`.
    #[schema(example = "0b6f3c2e-8f61-4d0f-9a2c-5be0f3f7a9d1.mp4")]
    pub filename: String,
    /// Stored size in bytes.
    #[schema(example = 10_485_760)]
    pub size_bytes: u64,
    /// When the link stops working (RFC 3339).
    #[schema(example = "2026-01-01T13:00:00Z")]
    pub expires_at: String,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            url: receipt.url,
            filename: receipt.filename,
            size_bytes: receipt.size_bytes,
            expires_at: receipt.expires_at.to_rfc3339(),
        }
    }
}

/// Query string of the raw bytes route.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadParams {
    /// When truthy (`1`/`true`), ask the browser to save instead of play.
    #[serde(default)]
    pub download: Option<String>,
}

impl DownloadParams {
    #[must_use]
    pub fn wants_attachment(&self) -> bool {
        matches!(self.download.as_deref(), Some("1" | "true" | "yes"))
    }
}

/// State of the expiry reaper.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReaperStatusResponse {
    /// Whether the reaper task was started.
    pub enabled: bool,
    /// `idle`, `scanning` or `deleting`.
    #[schema(example = "idle")]
    pub phase: String,
    /// Completed sweeps.
    pub sweeps: u64,
    /// Assets deleted on expiry.
    pub deleted: u64,
    /// Per-entry failures swallowed during sweeps.
    pub errors: u64,
    /// Unix time of the last completed sweep.
    pub last_sweep_unix: Option<i64>,
}

impl ReaperStatusResponse {
    pub fn new(enabled: bool, snap: &ReaperMetricsSnapshot) -> Self {
        Self {
            enabled,
            phase: serde_json::to_value(snap.phase)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default(),
            sweeps: snap.sweeps,
            deleted: snap.deleted,
            errors: snap.errors,
            last_sweep_unix: snap.last_sweep_unix,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status indicator.
    #[schema(example = "ok")]
    pub status: String,
    /// Asset lifetime in seconds.
    #[schema(example = 3600)]
    pub ttl_seconds: u64,
    /// Expiry reaper state.
    pub reaper: ReaperStatusResponse,
    /// Request counters.
    pub metrics: ServerMetricsSnapshot,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    #[schema(example = "file too large: the limit is 524288000 bytes")]
    pub error: String,
}
