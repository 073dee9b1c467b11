use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;

use crate::error::BlobError;
use crate::format::AssetFormat;
use crate::id::AssetId;
use crate::types::{BlobEntry, BlobInfo, BlobReader};

/// Byte source handed to [`BlobStore::put`].
pub type BlobSource<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Write-once blob storage keyed by [`AssetId`].
///
/// Implementations must make creation atomic from a reader's point of view:
/// a blob is either absent or complete, never partially visible. Ids are
/// validated [`AssetId`]s, so no implementation ever builds a path from raw
/// client input.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `source` into a new blob and return its metadata.
    ///
    /// Fails with [`BlobError::CapacityExceeded`] as soon as the stream
    /// grows past the configured ceiling; nothing is left behind in that case
    /// or when the source errors or the future is dropped.
    async fn put(
        &self,
        id: &AssetId,
        format: AssetFormat,
        source: BlobSource<'_>,
    ) -> Result<BlobInfo, BlobError>;

    /// Open a blob for reading. Returns `None` if it does not exist.
    async fn get(&self, id: &AssetId) -> Result<Option<BlobReader>, BlobError>;

    /// Metadata for a blob without opening it. Returns `None` if it does not exist.
    async fn stat(&self, id: &AssetId) -> Result<Option<BlobInfo>, BlobError>;

    /// Lightweight presence check.
    async fn exists(&self, id: &AssetId) -> Result<bool, BlobError> {
        Ok(self.stat(id).await?.is_some())
    }

    /// Delete a blob. Returns `true` if it existed; deleting an absent blob
    /// is not an error.
    async fn delete(&self, id: &AssetId) -> Result<bool, BlobError>;

    /// Enumerate current blobs with their age.
    ///
    /// The stream is a single pass over one snapshot of the store. Entries
    /// removed concurrently are skipped rather than reported as errors.
    fn list_all(&self) -> BoxStream<'static, Result<BlobEntry, BlobError>>;

    /// Maximum size of a single blob in bytes.
    fn max_blob_bytes(&self) -> u64;
}
