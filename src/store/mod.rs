//! Object storage the pipeline reads originals from and writes derived images to.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::io;

pub mod memory;
pub mod s3;
pub mod upload;

pub use self::{memory::MemoryStore, s3::S3Store};

/// Ordered, finite and non restartable sequence of chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// What the store reports after a durable write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub location: String,
    pub etag: Option<String>,
    pub size: u64,
    pub parts: u16,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open the object for incremental reading
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` when the key does not exist, `StorageUnavailable` for
    /// any other fault
    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream>;

    /// Drain `body` into the object, resolves once the store acknowledged it
    ///
    /// # Errors
    ///
    /// `StorageWrite` on any fault, including an `Err` item in `body`; nothing
    /// is left behind in that case
    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<UploadResult>;
}
