use serde::Serialize;

use super::{EphemeraConfig, ReaperServerConfig, ServerConfig, StorageConfig, TelemetryConfig};

/// Operator-facing view of the effective configuration.
///
/// Leaves out anything that reveals the host filesystem layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSnapshot {
    pub server: ServerSnapshot,
    pub storage: StorageSnapshot,
    pub reaper: ReaperSnapshot,
    pub telemetry: TelemetrySnapshot,
}

impl From<&EphemeraConfig> for ConfigSnapshot {
    fn from(cfg: &EphemeraConfig) -> Self {
        Self {
            server: ServerSnapshot::from(&cfg.server),
            storage: StorageSnapshot::from(&cfg.storage),
            reaper: ReaperSnapshot::from(&cfg.reaper),
            telemetry: TelemetrySnapshot::from(&cfg.telemetry),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerSnapshot {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
    pub external_url: Option<String>,
}

impl From<&ServerConfig> for ServerSnapshot {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            shutdown_timeout_seconds: cfg.shutdown_timeout_seconds,
            external_url: cfg.external_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageSnapshot {
    pub max_upload_bytes: u64,
}

impl From<&StorageConfig> for StorageSnapshot {
    fn from(cfg: &StorageConfig) -> Self {
        Self {
            max_upload_bytes: cfg.max_upload_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReaperSnapshot {
    pub enabled: bool,
    pub sweep_interval_seconds: u64,
    pub ttl_seconds: u64,
}

impl From<&ReaperServerConfig> for ReaperSnapshot {
    fn from(cfg: &ReaperServerConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            sweep_interval_seconds: cfg.sweep_interval_seconds,
            ttl_seconds: cfg.ttl_seconds,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub enabled: bool,
    pub service_name: String,
    pub protocol: String,
}

impl From<&TelemetryConfig> for TelemetrySnapshot {
    fn from(cfg: &TelemetryConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            service_name: cfg.service_name.clone(),
            protocol: cfg.protocol.clone(),
        }
    }
}
