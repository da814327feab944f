//! Persistence backends for static-file downloads.

mod fs;
#[cfg(feature = "redis-store")]
mod redis_store;

pub use fs::{FsWriter, MIN_FILE_BYTES};
#[cfg(feature = "redis-store")]
pub use redis_store::{RedisWriter, REDIS_QUEUE_KEY};

use std::path::Path;

use async_trait::async_trait;

use crate::error::ResponseError;
use crate::request::Request;

/// Where downloaded file bodies end up.
///
/// Shared between the file pipeline (which asks `not_exists` before
/// scheduling a download) and the downloader's file branch (which hands the
/// body to `write_file`).
#[async_trait]
pub trait FileWriter: Send + Sync {
    /// True when the target is absent or too small to be a finished
    /// download, i.e. worth (re-)fetching.
    async fn not_exists(&self, path: &Path) -> bool;

    /// Persists the body of a file request and describes the outcome.
    ///
    /// A successful write reports a [`ResponseError::Drop`]: stored on the
    /// response, it stops the chain from treating the download like a page.
    async fn write_file(&self, req: &Request, body: &[u8]) -> (String, ResponseError);
}
