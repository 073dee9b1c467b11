use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::format::AssetFormat;
use crate::id::AssetId;

/// Metadata for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobInfo {
    /// Asset identifier.
    pub id: AssetId,
    /// Container format (drives the extension and the served media type).
    pub format: AssetFormat,
    /// Size in bytes, fixed at creation.
    pub size_bytes: u64,
    /// When the last byte was durably written.
    pub created_at: DateTime<Utc>,
    /// Location on the backing medium. Never shown to clients.
    #[serde(skip)]
    pub path: PathBuf,
}

impl BlobInfo {
    /// The on-disk file name, `<id>.<ext>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        blob_file_name(&self.id, self.format)
    }

    /// Age relative to `now`; zero if the clock went backwards.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }
}

/// One row of a store listing, as seen by the reaper.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    /// Blob metadata at listing time.
    pub info: BlobInfo,
    /// Age at listing time.
    pub age: Duration,
}

/// An opened blob, positioned at its first byte.
#[derive(Debug)]
pub struct BlobReader {
    /// Blob metadata.
    pub info: BlobInfo,
    /// Readable handle. The content stays readable even if the blob is
    /// deleted while the handle is open.
    pub file: tokio::fs::File,
}

/// Build the file name a blob is stored under.
#[must_use]
pub fn blob_file_name(id: &AssetId, format: AssetFormat) -> String {
    format!("{id}.{}", format.extension())
}

/// Split a stored file name back into id and format.
///
/// Returns `None` for anything that is not `<canonical id>.<known ext>`.
#[must_use]
pub fn parse_blob_file_name(name: &str) -> Option<(AssetId, AssetFormat)> {
    let (stem, ext) = name.split_once('.')?;
    let id = AssetId::parse(stem).ok()?;
    let format = AssetFormat::ALL
        .into_iter()
        .find(|f| f.extension() == ext)?;
    Some((id, format))
}
