#![allow(clippy::needless_for_each)]

use crate::metrics::ServerMetricsSnapshot;

use super::schemas::{ErrorResponse, HealthResponse, ReaperStatusResponse, UploadResponse};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Ephemera API",
        version = "0.1.0",
        description = "Upload a video, get a share link, and let it expire.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service health and counters"),
        (name = "Upload", description = "Video ingestion"),
        (name = "Share", description = "Share page and raw video access")
    ),
    paths(
        super::health::health,
        super::upload::upload,
        super::viewer::view,
        super::assets::raw,
    ),
    components(schemas(
        UploadResponse,
        ErrorResponse,
        HealthResponse,
        ReaperStatusResponse,
        ServerMetricsSnapshot,
    ))
)]
pub struct ApiDoc;
