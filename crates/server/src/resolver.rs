//! Maps an opaque reference from a request path to a servable asset.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use ephemera_blob::{AssetFormat, AssetId, BlobError, BlobStore};

/// The instant at which an asset created at `created_at` expires.
#[must_use]
pub fn expiry_of(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Everything the HTTP layer needs to show or serve one asset.
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    pub id: AssetId,
    pub format: AssetFormat,
    /// Stored file name, `<id>.<ext>`.
    pub file_name: String,
    /// Path of the raw bytes route.
    pub raw_url: String,
    /// Same as `raw_url`, but asks for an attachment disposition.
    pub download_url: String,
    pub media_type: &'static str,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Outcome of resolving a reference.
///
/// Never-issued, malformed and expired references all collapse into
/// [`Resolution::Absent`] so callers cannot tell them apart.
#[derive(Debug, Clone)]
pub enum Resolution {
    Present(AssetView),
    Absent,
}

impl Resolution {
    /// The view, if present.
    #[must_use]
    pub fn present(self) -> Option<AssetView> {
        match self {
            Self::Present(view) => Some(view),
            Self::Absent => None,
        }
    }
}

/// Read-side view of the blob store.
///
/// An asset whose age has reached the TTL is reported absent even if the
/// reaper has not deleted it yet.
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn BlobStore>,
    ttl: Duration,
}

impl AssetResolver {
    pub fn new(store: Arc<dyn BlobStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Asset lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve a bare id or a `<id>.<ext>` file name.
    ///
    /// Only storage faults are errors; anything that does not name a live
    /// asset is `Ok(Resolution::Absent)`.
    pub async fn resolve(&self, reference: &str) -> Result<Resolution, BlobError> {
        let (stem, ext) = match reference.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (reference, None),
        };
        let Ok(id) = AssetId::parse(stem) else {
            return Ok(Resolution::Absent);
        };
        let Some(info) = self.store.stat(&id).await? else {
            return Ok(Resolution::Absent);
        };
        if ext.is_some_and(|ext| ext != info.format.extension()) {
            return Ok(Resolution::Absent);
        }
        if info.age_at(Utc::now()) >= self.ttl {
            return Ok(Resolution::Absent);
        }

        let file_name = info.file_name();
        Ok(Resolution::Present(AssetView {
            raw_url: format!("/uploads/{file_name}"),
            download_url: format!("/uploads/{file_name}?download=1"),
            media_type: info.format.media_type(),
            expires_at: expiry_of(info.created_at, self.ttl),
            id: info.id,
            format: info.format,
            size_bytes: info.size_bytes,
            created_at: info.created_at,
            path: info.path,
            file_name,
        }))
    }
}
