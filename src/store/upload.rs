//! Amazon S3 multipart upload limits
//! Part size 5 MiB to 5 GiB, last part can be < 5 MiB
//! Maximum number of parts per upload  10,000
//! <https://docs.aws.amazon.com/AmazonS3/latest/dev/qfacts.html>

use crate::{
    s3::{
        S3,
        actions::{
            AbortMultipartUpload, CompleteMultipartUpload, CreateMultipartUpload, Part, PutObject,
            UploadPart,
        },
    },
    store::{ByteStream, UploadResult},
};
use anyhow::{Context, Result, anyhow, bail};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use url::Url;

pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_PARTS: u16 = 10_000;

/// Stream `body` into `key`, buffering at most one part.
///
/// Output smaller than `part_size` is sent with a single `PutObject`,
/// anything bigger goes through a multipart upload that is aborted unless it
/// completes.
///
/// # Errors
///
/// Will return `Err` if `body` yields an error or any request fails
pub async fn upload(
    s3: &S3,
    key: &str,
    content_type: &str,
    part_size: usize,
    mut body: ByteStream,
) -> Result<UploadResult> {
    let part_size = part_size.max(MIN_PART_SIZE);
    let mut buf = BytesMut::with_capacity(part_size);

    while buf.len() < part_size {
        match body.next().await {
            Some(chunk) => buf.extend_from_slice(&chunk.context("body stream failed")?),
            None => return put_object(s3, key, content_type, buf.freeze()).await,
        }
    }

    let mut upload = MultipartUpload::create(s3, key, content_type).await?;

    let result = match upload.send_stream(buf, part_size, &mut body).await {
        Ok(()) => upload.complete().await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        upload.abort().await;
    }

    result
}

async fn put_object(s3: &S3, key: &str, content_type: &str, body: Bytes) -> Result<UploadResult> {
    let size = body.len() as u64;

    log::debug!("PutObject {key}, {size} bytes");

    let etag = PutObject::new(key, body, content_type).request(s3).await?;

    Ok(UploadResult {
        bucket: s3.bucket().unwrap_or_default().to_string(),
        key: key.to_string(),
        location: object_url(s3, key)?.to_string(),
        etag,
        size,
        parts: 1,
    })
}

/// `<endpoint>/<bucket>/<key>`
///
/// # Errors
///
/// Will return `Err` if the endpoint is not a valid base URL
pub fn object_url(s3: &S3, key: &str) -> Result<Url> {
    let mut url = s3.endpoint()?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("endpoint cannot be a base: {}", s3.region().endpoint()))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url)
}

/// An open multipart upload, aborted on drop unless completed or aborted.
struct MultipartUpload<'a> {
    s3: &'a S3,
    key: &'a str,
    upload_id: String,
    parts: Vec<Part>,
    size: u64,
    finished: bool,
}

impl<'a> MultipartUpload<'a> {
    async fn create(s3: &'a S3, key: &'a str, content_type: &str) -> Result<Self> {
        let response = CreateMultipartUpload::new(key, content_type)
            .request(s3)
            .await?;

        log::debug!("CreateMultipartUpload {key}, upload id: {}", response.upload_id);

        Ok(Self {
            s3,
            key,
            upload_id: response.upload_id,
            parts: Vec::new(),
            size: 0,
            finished: false,
        })
    }

    /// Upload `buf` and the rest of `body` as parts of `part_size`, the last one can be smaller
    async fn send_stream(
        &mut self,
        mut buf: BytesMut,
        part_size: usize,
        body: &mut ByteStream,
    ) -> Result<()> {
        loop {
            while buf.len() >= part_size {
                let part = buf.split_to(part_size).freeze();
                self.send_part(part).await?;
            }

            match body.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk.context("body stream failed")?),
                None => break,
            }
        }

        if !buf.is_empty() {
            self.send_part(buf.freeze()).await?;
        }

        Ok(())
    }

    async fn send_part(&mut self, body: Bytes) -> Result<()> {
        if self.parts.len() >= usize::from(MAX_PARTS) {
            bail!("object exceeds {MAX_PARTS} parts");
        }

        let number = u16::try_from(self.parts.len() + 1)?;
        let size = body.len() as u64;

        let etag = UploadPart::new(self.key, &self.upload_id, number, body)
            .request(self.s3)
            .await
            .with_context(|| format!("part {number} of {}", self.key))?;

        log::debug!("UploadPart {number}, {size} bytes, etag: {etag}");

        self.size += size;
        self.parts.push(Part { etag, number });

        Ok(())
    }

    async fn complete(&mut self) -> Result<UploadResult> {
        let response = CompleteMultipartUpload::new(self.key, &self.upload_id, &self.parts)
            .request(self.s3)
            .await?;

        self.finished = true;

        let location = match response.location {
            Some(location) => location,
            None => object_url(self.s3, self.key)?.to_string(),
        };

        Ok(UploadResult {
            bucket: response.bucket,
            key: response.key,
            location,
            etag: Some(response.e_tag),
            size: self.size,
            parts: u16::try_from(self.parts.len())?,
        })
    }

    async fn abort(&mut self) {
        self.finished = true;

        log::warn!("AbortMultipartUpload {}, upload id: {}", self.key, self.upload_id);

        if let Err(e) = AbortMultipartUpload::new(self.key, &self.upload_id)
            .request(self.s3)
            .await
        {
            log::error!("unable to abort upload {}: {e}", self.upload_id);
        }
    }
}

impl Drop for MultipartUpload<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        // the future was dropped mid upload
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::error!("no runtime to abort upload {}", self.upload_id);
            return;
        };

        let s3 = self.s3.clone();
        let key = self.key.to_string();
        let upload_id = std::mem::take(&mut self.upload_id);

        handle.spawn(async move {
            log::warn!("AbortMultipartUpload {key}, upload id: {upload_id}");
            if let Err(e) = AbortMultipartUpload::new(&key, &upload_id)
                .request(&s3)
                .await
            {
                log::error!("unable to abort upload {upload_id}: {e}");
            }
        });
    }
}
