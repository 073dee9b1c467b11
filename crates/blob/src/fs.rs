//! Local filesystem blob backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<id>.<ext>        one file per live asset
//! <root>/.staging/upload-* in-flight uploads, never visible under a final name
//! ```
//!
//! Uploads are written to a temporary file in `.staging` (same filesystem as
//! the root) and moved into place with a no-clobber rename once every byte is
//! on disk. The directory itself is the index: there is no in-memory map to
//! keep in sync with it.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::BlobError;
use crate::format::AssetFormat;
use crate::id::AssetId;
use crate::store::{BlobSource, BlobStore};
use crate::types::{BlobEntry, BlobInfo, BlobReader, blob_file_name, parse_blob_file_name};

/// Name of the staging sub-directory.
pub const STAGING_DIR: &str = ".staging";

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Blob store backed by a flat local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    staging: PathBuf,
    max_blob_bytes: u64,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Leftover staging files from a previous process are removed. Failure to
    /// create the directories is returned to the caller and is expected to be
    /// fatal at startup.
    pub async fn open(root: impl Into<PathBuf>, max_blob_bytes: u64) -> Result<Self, BlobError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        let store = Self {
            root,
            staging,
            max_blob_bytes,
        };

        let purged = store.purge_staging().await?;
        if purged > 0 {
            info!(purged, "removed abandoned staging files");
        }
        info!(
            root = %store.root.display(),
            max_blob_bytes,
            "filesystem blob store ready"
        );

        Ok(store)
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &AssetId, format: AssetFormat) -> PathBuf {
        self.root.join(blob_file_name(id, format))
    }

    async fn purge_staging(&self) -> Result<usize, BlobError> {
        let mut dir = fs::read_dir(&self.staging).await?;
        let mut purged = 0;
        while let Some(entry) = dir.next_entry().await? {
            match fs::remove_file(entry.path()).await {
                Ok(()) => purged += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "could not remove staging file"
                ),
            }
        }
        Ok(purged)
    }
}

/// Creation time of a blob is its modification time; a filesystem that
/// cannot report one is an error, otherwise the blob would never age.
fn created_at(modified: io::Result<SystemTime>) -> Result<DateTime<Utc>, BlobError> {
    Ok(DateTime::<Utc>::from(modified?))
}

fn info_from_metadata(
    id: AssetId,
    format: AssetFormat,
    path: PathBuf,
    meta: &std::fs::Metadata,
) -> Result<BlobInfo, BlobError> {
    Ok(BlobInfo {
        id,
        format,
        size_bytes: meta.len(),
        created_at: created_at(meta.modified())?,
        path,
    })
}

/// Copy `source` into `sink`, failing as soon as more than `limit` bytes arrive.
async fn copy_bounded(
    source: BlobSource<'_>,
    sink: &mut fs::File,
    limit: u64,
) -> Result<u64, BlobError> {
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut total: u64 = 0;
    loop {
        let n = source.read(&mut buf).await.map_err(BlobError::Source)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > limit {
            return Err(BlobError::CapacityExceeded { limit });
        }
        sink.write_all(&buf[..n]).await?;
    }
    sink.flush().await?;
    Ok(total)
}

async fn blocking<T, F>(f: F) -> Result<T, BlobError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BlobError::Io(io::Error::other(e)))?
        .map_err(BlobError::Io)
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        id: &AssetId,
        format: AssetFormat,
        source: BlobSource<'_>,
    ) -> Result<BlobInfo, BlobError> {
        let staging = self.staging.clone();
        let staged = blocking(move || {
            tempfile::Builder::new()
                .prefix("upload-")
                .tempfile_in(staging)
        })
        .await?;

        // `temp_path` deletes the staging file when dropped, which covers
        // every early return below as well as a cancelled future.
        let (file, temp_path) = staged.into_parts();
        let mut file = fs::File::from_std(file);
        let written = copy_bounded(source, &mut file, self.max_blob_bytes).await?;
        file.sync_all().await?;
        drop(file);

        let final_path = self.path_for(id, format);
        let target = final_path.clone();
        blocking(move || temp_path.persist_noclobber(target).map_err(|e| e.error))
            .await
            .map_err(|e| match e {
                BlobError::Io(io) if io.kind() == ErrorKind::AlreadyExists => {
                    BlobError::AlreadyExists(id.to_string())
                }
                other => other,
            })?;

        let meta = fs::metadata(&final_path).await?;
        debug!(asset_id = %id, size_bytes = written, "blob stored");
        info_from_metadata(*id, format, final_path, &meta)
    }

    async fn get(&self, id: &AssetId) -> Result<Option<BlobReader>, BlobError> {
        let Some(info) = self.stat(id).await? else {
            return Ok(None);
        };
        match fs::File::open(&info.path).await {
            Ok(file) => Ok(Some(BlobReader { info, file })),
            // Deleted between stat and open: same as never having existed.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, id: &AssetId) -> Result<Option<BlobInfo>, BlobError> {
        for format in AssetFormat::ALL {
            let path = self.path_for(id, format);
            match fs::symlink_metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    return info_from_metadata(*id, format, path, &meta).map(Some);
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    async fn delete(&self, id: &AssetId) -> Result<bool, BlobError> {
        let mut removed = false;
        for format in AssetFormat::ALL {
            match fs::remove_file(self.path_for(id, format)).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn list_all(&self) -> BoxStream<'static, Result<BlobEntry, BlobError>> {
        enum Listing {
            Pending(PathBuf),
            Reading(fs::ReadDir),
            Done,
        }

        futures::stream::unfold(Listing::Pending(self.root.clone()), |state| async move {
            let mut dir = match state {
                Listing::Pending(root) => match fs::read_dir(&root).await {
                    Ok(dir) => dir,
                    Err(e) => return Some((Err(e.into()), Listing::Done)),
                },
                Listing::Reading(dir) => dir,
                Listing::Done => return None,
            };

            loop {
                let entry = match dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e.into()), Listing::Done)),
                };
                let Some((id, format)) = entry.file_name().to_str().and_then(parse_blob_file_name)
                else {
                    continue;
                };
                match entry.metadata().await {
                    Ok(meta) if meta.is_file() => {
                        let listed =
                            info_from_metadata(id, format, entry.path(), &meta).map(|info| {
                                let age = info.age_at(Utc::now());
                                BlobEntry { info, age }
                            });
                        return Some((listed, Listing::Reading(dir)));
                    }
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Some((Err(e.into()), Listing::Reading(dir))),
                }
            }
        })
        .boxed()
    }

    fn max_blob_bytes(&self) -> u64 {
        self.max_blob_bytes
    }
}
