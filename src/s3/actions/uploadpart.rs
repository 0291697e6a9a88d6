use crate::s3::{
    S3,
    actions::{Action, response_error},
    request, tools,
};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct UploadPart<'a> {
    key: &'a str,
    upload_id: &'a str,
    part_number: String,
    body: Bytes,
}

impl<'a> UploadPart<'a> {
    #[must_use]
    pub fn new(key: &'a str, upload_id: &'a str, part_number: u16, body: Bytes) -> Self {
        Self {
            key,
            upload_id,
            part_number: part_number.to_string(),
            body,
        }
    }

    /// Returns the `ETag` of the part
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(self, s3: &S3) -> Result<String> {
        let sha = tools::sha256_hex(&self.body);
        let md5 = tools::base64_md5(&self.body);

        let (url, headers) = &self.sign(s3, &sha, Some(&md5))?;
        let response = request::request(
            s3,
            url.clone(),
            self.http_method(),
            headers,
            Some(self.body.clone()),
        )
        .await?;

        if response.status().is_success() {
            match response.headers().get("ETag") {
                Some(etag) => Ok(etag.to_str()?.to_string()),
                None => Err(anyhow!("missing ETag for part {}", self.part_number)),
            }
        } else {
            Err(response_error(response).await)
        }
    }
}

// https://docs.aws.amazon.com/AmazonS3/latest/API/API_UploadPart.html
impl Action for UploadPart<'_> {
    fn http_method(&self) -> Method {
        Method::PUT
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("partNumber", &self.part_number);
        map.insert("uploadId", self.upload_id);
        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(self.key.split('/').collect())
    }
}
