use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};

use serde::Serialize;

use crate::reaper::{ReaperPhase, SweepReport};

/// Atomic counters tracking the expiry reaper.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ReaperMetrics {
    /// Completed sweeps.
    pub sweeps: AtomicU64,
    /// Blobs deleted because they outlived the TTL.
    pub deleted: AtomicU64,
    /// Per-entry failures (listing or delete) swallowed during sweeps.
    pub errors: AtomicU64,
    /// Unix timestamp (seconds) of the last completed sweep, 0 if none.
    pub last_sweep_unix: AtomicI64,
    phase: AtomicU8,
}

impl ReaperMetrics {
    /// Record the phase the reaper just entered.
    pub fn set_phase(&self, phase: ReaperPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    /// Current reaper phase.
    pub fn phase(&self) -> ReaperPhase {
        ReaperPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    /// Fold the outcome of one sweep into the counters.
    pub fn record_sweep(&self, report: &SweepReport) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.deleted.fetch_add(report.deleted, Ordering::Relaxed);
        self.errors.fetch_add(report.errors, Ordering::Relaxed);
        self.last_sweep_unix
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> ReaperMetricsSnapshot {
        ReaperMetricsSnapshot {
            phase: self.phase(),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_sweep_unix: match self.last_sweep_unix.load(Ordering::Relaxed) {
                0 => None,
                ts => Some(ts),
            },
        }
    }
}

/// A plain data snapshot of [`ReaperMetrics`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaperMetricsSnapshot {
    pub phase: ReaperPhase,
    pub sweeps: u64,
    pub deleted: u64,
    pub errors: u64,
    pub last_sweep_unix: Option<i64>,
}
