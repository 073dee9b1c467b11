//! Upload validation in front of the blob store.
//!
//! The media-type check is a UX guard against obvious mistakes, not a
//! security boundary: content is never sniffed or transcoded.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use ephemera_blob::{AssetFormat, AssetId, BlobError, BlobInfo, BlobStore};

use crate::resolver::expiry_of;

/// Name of the multipart field carrying the file.
pub const VIDEO_FIELD: &str = "video";

/// Allowance for multipart framing and plain form fields on top of the file
/// size ceiling, for both the declared `Content-Length` and the streamed body.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Reasons an upload is refused.
#[derive(Debug, Error)]
pub enum IngressError {
    /// The file is larger than the ceiling.
    #[error("file too large: more than {limit} bytes")]
    TooLarge {
        /// Ceiling in bytes.
        limit: u64,
    },

    /// The declared media type is not a video type.
    #[error("only video files are accepted, got {0:?}")]
    InvalidType(String),

    /// The request carried no file.
    #[error("no file uploaded: expected a `video` file field")]
    MissingFile,

    /// The request was malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The blob store failed while persisting the file.
    #[error(transparent)]
    Storage(BlobError),
}

impl From<BlobError> for IngressError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::CapacityExceeded { limit } => Self::TooLarge { limit },
            err if err.is_storage_fault() => Self::Storage(err),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// What the uploader gets back.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    /// Newly minted asset id.
    pub id: AssetId,
    /// Stored file name, `<id>.<ext>`.
    pub filename: String,
    /// Share path, `/v/<id>`.
    pub url: String,
    /// Bytes stored.
    pub size_bytes: u64,
    /// When the asset becomes eligible for deletion.
    pub expires_at: DateTime<Utc>,
}

/// Whether a declared media type names video content.
#[must_use]
pub fn is_video_media_type(media_type: &str) -> bool {
    media_type
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("video/"))
}

/// Validates one upload per request and hands the bytes to the store.
///
/// Holds no mutable state of its own; concurrent uploads only meet in the
/// blob store.
#[derive(Clone)]
pub struct IngressGate {
    store: Arc<dyn BlobStore>,
    ttl: Duration,
}

impl IngressGate {
    /// Create a gate in front of `store`; `ttl` is only used to report the
    /// expiry time back to the uploader.
    pub fn new(store: Arc<dyn BlobStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Size ceiling for one file.
    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.store.max_blob_bytes()
    }

    /// Refuse a request whose declared length cannot fit under the ceiling,
    /// before any of the body is read.
    pub fn check_content_length(&self, declared: Option<u64>) -> Result<(), IngressError> {
        let limit = self.max_upload_bytes();
        match declared {
            Some(len) if len > limit.saturating_add(MULTIPART_OVERHEAD_BYTES) => {
                Err(IngressError::TooLarge { limit })
            }
            _ => Ok(()),
        }
    }

    /// Consume a multipart body and store its single `video` file.
    ///
    /// If the request turns out to be invalid after a file was already
    /// stored (e.g. a second file follows), the stored asset is deleted
    /// before the error is returned.
    pub async fn accept(&self, mut multipart: Multipart) -> Result<UploadReceipt, IngressError> {
        let mut stored = None;
        if let Err(e) = self.accept_fields(&mut multipart, &mut stored).await {
            if let Some(info) = stored {
                self.discard(&info).await;
            }
            return Err(e);
        }

        let info = stored.ok_or(IngressError::MissingFile)?;
        info!(
            asset_id = %info.id,
            size_bytes = info.size_bytes,
            format = %info.format,
            "upload stored"
        );
        Ok(UploadReceipt {
            filename: info.file_name(),
            url: format!("/v/{}", info.id),
            size_bytes: info.size_bytes,
            expires_at: expiry_of(info.created_at, self.ttl),
            id: info.id,
        })
    }

    async fn accept_fields(
        &self,
        multipart: &mut Multipart,
        stored: &mut Option<BlobInfo>,
    ) -> Result<(), IngressError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| self.multipart_error(&e))?
        {
            // Plain form values are skipped; their bytes still count
            // towards the request body limit.
            let Some(file_name) = field.file_name().map(str::to_owned) else {
                continue;
            };
            if field.name() != Some(VIDEO_FIELD) {
                return Err(IngressError::InvalidInput(format!(
                    "unexpected file field: files must be sent as `{VIDEO_FIELD}`"
                )));
            }
            if stored.is_some() {
                return Err(IngressError::InvalidInput(
                    "only one file may be uploaded per request".to_owned(),
                ));
            }

            let media_type = field.content_type().map(str::to_owned);
            let declared = media_type.as_deref().unwrap_or("application/octet-stream");
            if !is_video_media_type(declared) {
                return Err(IngressError::InvalidType(declared.to_owned()));
            }

            let format = AssetFormat::detect(Some(&file_name), media_type.as_deref());
            let id = AssetId::generate();
            let reader = StreamReader::new(field.map_err(io::Error::other));
            tokio::pin!(reader);
            let info = self
                .store
                .put(&id, format, &mut reader)
                .await
                .map_err(|e| self.put_error(e))?;
            *stored = Some(info);
        }
        Ok(())
    }

    fn multipart_error(&self, err: &MultipartError) -> IngressError {
        if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
            return IngressError::TooLarge {
                limit: self.max_upload_bytes(),
            };
        }
        IngressError::InvalidInput(format!("malformed multipart body: {}", err.body_text()))
    }

    /// A body limit hit while the file streams surfaces as a source error
    /// wrapping the multipart error.
    fn put_error(&self, err: BlobError) -> IngressError {
        if let BlobError::Source(source) = &err
            && let Some(multipart) = source
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return self.multipart_error(multipart);
        }
        err.into()
    }

    async fn discard(&self, info: &BlobInfo) {
        if let Err(e) = self.store.delete(&info.id).await {
            warn!(asset_id = %info.id, error = %e, "failed to discard rejected upload");
        }
    }
}
