use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request counters for the HTTP surface.
///
/// All counters use relaxed ordering; read them through
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Uploads stored successfully.
    pub uploads_accepted: AtomicU64,
    /// Uploads refused for a client-side reason (size, type, shape).
    pub uploads_rejected: AtomicU64,
    /// Uploads that failed on the storage side.
    pub uploads_failed: AtomicU64,
    /// Bytes accepted across all stored uploads.
    pub bytes_uploaded: AtomicU64,
    /// Share pages rendered for a present asset.
    pub views_served: AtomicU64,
    /// Share or raw lookups that found nothing.
    pub lookups_absent: AtomicU64,
    /// Raw byte responses started.
    pub downloads_served: AtomicU64,
}

impl ServerMetrics {
    pub fn increment_uploads_accepted(&self, size_bytes: u64) {
        self.uploads_accepted.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(size_bytes, Ordering::Relaxed);
    }

    pub fn increment_uploads_rejected(&self) {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_uploads_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_views_served(&self) {
        self.views_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lookups_absent(&self) {
        self.lookups_absent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_downloads_served(&self) {
        self.downloads_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            uploads_accepted: self.uploads_accepted.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            views_served: self.views_served.load(Ordering::Relaxed),
            lookups_absent: self.lookups_absent.load(Ordering::Relaxed),
            downloads_served: self.downloads_served.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`ServerMetrics`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServerMetricsSnapshot {
    pub uploads_accepted: u64,
    pub uploads_rejected: u64,
    pub uploads_failed: u64,
    pub bytes_uploaded: u64,
    pub views_served: u64,
    pub lookups_absent: u64,
    pub downloads_served: u64,
}
