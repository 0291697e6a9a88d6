use crate::{
    error::{ResizeError, Result},
    s3::{
        S3,
        actions::{GetObject, ResponseError},
    },
    store::{ByteStream, ObjectStore, UploadResult, upload},
};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::{borrow::Cow, io};

/// `ObjectStore` backed by the SigV4 client.
#[derive(Debug, Clone)]
pub struct S3Store {
    s3: S3,
    part_size: usize,
}

impl S3Store {
    #[must_use]
    pub const fn new(s3: S3) -> Self {
        Self {
            s3,
            part_size: upload::MIN_PART_SIZE,
        }
    }

    /// Bytes buffered before a part is sent, never below 5 MiB
    #[must_use]
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(upload::MIN_PART_SIZE);
        self
    }

    #[must_use]
    pub const fn part_size(&self) -> usize {
        self.part_size
    }

    fn bucket(&self, bucket: &str) -> Cow<'_, S3> {
        if self.s3.bucket() == Some(bucket) {
            Cow::Borrowed(&self.s3)
        } else {
            Cow::Owned(self.s3.with_bucket(bucket))
        }
    }
}

/// A missing key is the caller's problem, everything else is ours
fn get_error(key: &str, e: &anyhow::Error) -> ResizeError {
    match e.downcast_ref::<ResponseError>() {
        Some(response) if response.is_not_found() => ResizeError::ObjectNotFound {
            key: key.to_string(),
        },
        _ => ResizeError::StorageUnavailable(format!("{e:#}")),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let s3 = self.bucket(bucket);

        let response = GetObject::new(key)
            .request(&s3)
            .await
            .map_err(|e| get_error(key, &e))?;

        log::debug!(
            "GetObject {bucket}/{key}, content-length: {:?}",
            response.content_length()
        );

        Ok(Box::pin(response.bytes_stream().map_err(io::Error::other)))
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<UploadResult> {
        let s3 = self.bucket(bucket);

        upload::upload(&s3, key, content_type, self.part_size, body)
            .await
            .map_err(|e| ResizeError::StorageWrite(format!("{e:#}")))
    }
}
