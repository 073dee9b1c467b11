mod reaper;
mod server;
mod snapshot;
mod storage;
mod telemetry;


pub use reaper::*;
pub use server::*;
pub use snapshot::*;
pub use storage::*;
pub use telemetry::*;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Ephemera server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct EphemeraConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload directory and size ceiling.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Expiry sweep configuration.
    #[serde(default)]
    pub reaper: ReaperServerConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl EphemeraConfig {
    /// Reject values the server cannot run with.
    ///
    /// A TTL that is not larger than the sweep interval is allowed but
    /// logged, since assets may then disappear earlier than users expect
    /// relative to the advertised lifetime.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.storage.max_upload_bytes == 0 {
            return Err(ServerError::Config(
                "storage.max_upload_bytes must be greater than zero".into(),
            ));
        }
        if self.storage.upload_dir.trim().is_empty() {
            return Err(ServerError::Config(
                "storage.upload_dir must not be empty".into(),
            ));
        }
        if self.reaper.sweep_interval_seconds == 0 {
            return Err(ServerError::Config(
                "reaper.sweep_interval_seconds must be greater than zero".into(),
            ));
        }
        if !crate::render::is_plain_base_url(&self.external_url()) {
            return Err(ServerError::Config(
                "server.external_url must be an absolute http(s) url without quotes, markup or whitespace"
                    .into(),
            ));
        }
        if self.reaper.ttl_seconds <= self.reaper.sweep_interval_seconds {
            tracing::warn!(
                ttl_seconds = self.reaper.ttl_seconds,
                sweep_interval_seconds = self.reaper.sweep_interval_seconds,
                "asset TTL is not larger than the sweep interval"
            );
        }
        Ok(())
    }

    /// Base URL used to build absolute share links.
    #[must_use]
    pub fn external_url(&self) -> String {
        self.server
            .external_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
            .trim_end_matches('/')
            .to_owned()
    }
}
