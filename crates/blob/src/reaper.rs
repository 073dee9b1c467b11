//! Expiry reaper.
//!
//! A periodic full scan of the store; there is no per-asset timer. An asset
//! may outlive its TTL on disk by at most one sweep interval.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::metrics::ReaperMetrics;
use crate::store::BlobStore;

/// Configuration for the expiry reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// How often to sweep (default: 15 minutes).
    pub sweep_interval: Duration,
    /// Maximum age of a blob before it is deleted (default: 1 hour).
    pub ttl: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(15 * 60),
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Where the reaper is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ReaperPhase {
    #[default]
    Idle = 0,
    Scanning = 1,
    Deleting = 2,
}

impl ReaperPhase {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Scanning,
            2 => Self::Deleting,
            _ => Self::Idle,
        }
    }
}

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries seen in the listing.
    pub scanned: u64,
    /// Entries deleted for being past the TTL.
    pub deleted: u64,
    /// Listing or delete failures that were skipped.
    pub errors: u64,
}

/// Background task that deletes blobs older than the TTL.
pub struct Reaper {
    config: ReaperConfig,
    store: Arc<dyn BlobStore>,
    metrics: Arc<ReaperMetrics>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Reaper {
    /// Run sweeps on the configured interval until shutdown is signaled.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep is slow
    /// are skipped, not queued.
    pub async fn run(&mut self) {
        info!(
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            ttl_secs = self.config.ttl.as_secs(),
            "expiry reaper starting"
        );

        let mut ticker = interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("expiry reaper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        info!("expiry reaper stopped");
    }

    /// Run one scan-and-delete cycle over the whole store.
    ///
    /// Individual failures are logged and counted; they never stop the sweep.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        self.metrics.set_phase(ReaperPhase::Scanning);

        let mut entries = self.store.list_all();
        while let Some(next) = entries.next().await {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "expiry reaper: listing error");
                    report.errors += 1;
                    continue;
                }
            };
            report.scanned += 1;

            if entry.age < self.config.ttl {
                continue;
            }

            self.metrics.set_phase(ReaperPhase::Deleting);
            match self.store.delete(&entry.info.id).await {
                Ok(true) => {
                    debug!(
                        asset_id = %entry.info.id,
                        age_secs = entry.age.as_secs(),
                        "expired asset deleted"
                    );
                    report.deleted += 1;
                }
                // Gone already; nothing to do.
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        asset_id = %entry.info.id,
                        error = %e,
                        "expiry reaper: error deleting asset"
                    );
                    report.errors += 1;
                }
            }
            self.metrics.set_phase(ReaperPhase::Scanning);
        }

        self.metrics.set_phase(ReaperPhase::Idle);
        self.metrics.record_sweep(&report);

        if report.deleted > 0 || report.errors > 0 {
            info!(
                scanned = report.scanned,
                deleted = report.deleted,
                errors = report.errors,
                "expiry sweep complete"
            );
        } else {
            debug!(scanned = report.scanned, "expiry sweep complete");
        }

        report
    }

    /// Reaper configuration.
    #[must_use]
    pub fn config(&self) -> ReaperConfig {
        self.config
    }
}

/// Builder for creating a [`Reaper`].
#[derive(Default)]
pub struct ReaperBuilder {
    config: ReaperConfig,
    store: Option<Arc<dyn BlobStore>>,
    metrics: Option<Arc<ReaperMetrics>>,
}

impl ReaperBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: ReaperConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the store to sweep.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share metrics with the caller (a fresh set is created otherwise).
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ReaperMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the reaper.
    ///
    /// Returns the reaper and a shutdown sender.
    pub fn build(self) -> Result<(Reaper, mpsc::Sender<()>), &'static str> {
        let store = self.store.ok_or("blob store is required")?;
        if self.config.sweep_interval.is_zero() {
            return Err("sweep interval must be non-zero");
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let reaper = Reaper {
            config: self.config,
            store,
            metrics: self.metrics.unwrap_or_default(),
            shutdown_rx,
        };
        Ok((reaper, shutdown_tx))
    }
}
