//! Time-bounded local blob storage.
//!
//! - [`AssetId`]: opaque, collision-resistant identifiers that double as
//!   safe file names.
//! - [`BlobStore`] / [`FsBlobStore`]: write-once storage with atomic
//!   publication and a flat directory as the only index.
//! - [`Reaper`]: the periodic sweep that deletes blobs past their TTL.

pub mod error;
pub mod format;
pub mod fs;
pub mod id;
pub mod metrics;
pub mod reaper;
pub mod store;
pub mod types;

pub use error::BlobError;
pub use format::AssetFormat;
pub use fs::FsBlobStore;
pub use id::AssetId;
pub use metrics::{ReaperMetrics, ReaperMetricsSnapshot};
pub use reaper::{Reaper, ReaperBuilder, ReaperConfig, ReaperPhase, SweepReport};
pub use store::{BlobSource, BlobStore};
pub use types::{BlobEntry, BlobInfo, BlobReader};
