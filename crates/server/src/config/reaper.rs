use std::time::Duration;

use serde::Deserialize;

use ephemera_blob::ReaperConfig;

/// Configuration for the expiry reaper.
///
/// # Example
///
/// ```toml
/// [reaper]
/// enabled = true
/// sweep_interval_seconds = 900
/// ttl_seconds = 3600
/// ```
#[derive(Debug, Deserialize)]
pub struct ReaperServerConfig {
    /// Whether the reaper runs. Turning it off keeps assets forever, which is
    /// only useful for debugging.
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,
    /// How often to sweep the upload directory (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Maximum asset age before deletion (seconds).
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for ReaperServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            sweep_interval_seconds: default_sweep_interval(),
            ttl_seconds: default_ttl(),
        }
    }
}

impl ReaperServerConfig {
    /// Asset time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Convert to the reaper's runtime configuration.
    #[must_use]
    pub fn to_reaper_config(&self) -> ReaperConfig {
        ReaperConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_seconds),
            ttl: self.ttl(),
        }
    }
}

fn default_reaper_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    15 * 60
}

fn default_ttl() -> u64 {
    60 * 60
}
