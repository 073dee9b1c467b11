use serde::Deserialize;

/// Configuration for the upload directory.
///
/// # Example
///
/// ```toml
/// [storage]
/// upload_dir = "/var/lib/ephemera/uploads"
/// max_upload_bytes = 524288000
/// ```
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per live asset (default: `"uploads"`).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Maximum size of a single upload in bytes (default: 500 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_upload_dir() -> String {
    "uploads".to_owned()
}

fn default_max_upload_bytes() -> u64 {
    500 * 1024 * 1024 // 500 MiB
}
