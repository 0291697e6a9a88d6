use crate::{
    error::{ResizeError, Result},
    store::{ByteStream, ObjectStore, UploadResult},
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, stream};
use std::{
    collections::HashMap,
    io,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In process store, objects are served back in small chunks to exercise streaming.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    chunk_size: usize,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default().with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, bucket: &str, key: &str, content_type: &str, body: impl Into<Bytes>) {
        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Number of `get_object_stream` calls so far
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `put_object_stream` calls so far
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let object = self.object(bucket, key).ok_or_else(|| ResizeError::ObjectNotFound {
            key: key.to_string(),
        })?;

        let mut body = object.body;
        let mut chunks: Vec<io::Result<Bytes>> = Vec::new();
        while !body.is_empty() {
            let n = self.chunk_size.min(body.len());
            chunks.push(Ok(body.split_to(n)));
        }

        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut body: ByteStream,
    ) -> Result<UploadResult> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ResizeError::StorageWrite(e.to_string()))?;
            buf.extend_from_slice(&chunk);
        }

        let body = buf.freeze();
        let size = body.len() as u64;
        self.insert(bucket, key, content_type, body);

        Ok(UploadResult {
            bucket: bucket.to_string(),
            key: key.to_string(),
            location: format!("memory://{bucket}/{key}"),
            etag: None,
            size,
            parts: 1,
        })
    }
}
