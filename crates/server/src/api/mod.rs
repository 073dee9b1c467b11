pub mod assets;
pub mod config;
pub mod health;
pub mod openapi;
pub mod schemas;
pub mod upload;
pub mod viewer;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ephemera_blob::{BlobStore, ReaperMetrics};

use crate::config::ConfigSnapshot;
use crate::ingress::{IngressGate, MULTIPART_OVERHEAD_BYTES};
use crate::metrics::ServerMetrics;
use crate::render::LinkRenderer;
use crate::resolver::AssetResolver;

use self::openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upload validation and persistence.
    pub ingress: IngressGate,
    /// Id to asset lookup, with the read-side TTL check.
    pub resolver: AssetResolver,
    /// Share page renderer.
    pub renderer: Arc<dyn LinkRenderer>,
    /// Request counters.
    pub metrics: Arc<ServerMetrics>,
    /// Reaper counters (None when the reaper is disabled).
    pub reaper: Option<Arc<ReaperMetrics>>,
    /// Effective configuration, safe to expose.
    pub config: ConfigSnapshot,
}

impl AppState {
    /// Wire the ingress gate and resolver to one store and asset lifetime.
    pub fn new(store: Arc<dyn BlobStore>, ttl: Duration, renderer: Arc<dyn LinkRenderer>) -> Self {
        Self {
            ingress: IngressGate::new(Arc::clone(&store), ttl),
            resolver: AssetResolver::new(store, ttl),
            renderer,
            metrics: Arc::default(),
            reaper: None,
            config: ConfigSnapshot::default(),
        }
    }

    #[must_use]
    pub fn with_reaper_metrics(mut self, metrics: Arc<ReaperMetrics>) -> Self {
        self.reaper = Some(metrics);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ConfigSnapshot) -> Self {
        self.config = config;
        self
    }
}

/// Build the Axum router with all routes, middleware, and Swagger UI.
pub fn router(state: AppState) -> Router {
    // The whole upload request, form fields included, stays under the file
    // ceiling plus framing; the file itself is also bounded while streaming.
    let upload_limit = state
        .ingress
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health::health))
        .route("/admin/config", get(config::get_config))
        .route(
            "/api/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/v/{id}", get(viewer::view))
        .route("/uploads/{name}", get(assets::raw))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
