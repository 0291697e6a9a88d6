use crate::s3::{
    S3,
    actions::{Action, response_error},
    request, tools,
};
use anyhow::Result;
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct PutObject<'a> {
    key: &'a str,
    body: Bytes,
    content_type: &'a str,
}

impl<'a> PutObject<'a> {
    #[must_use]
    pub const fn new(key: &'a str, body: Bytes, content_type: &'a str) -> Self {
        Self {
            key,
            body,
            content_type,
        }
    }

    /// Returns the `ETag` of the stored object when S3 sends one
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or S3 answers with an error
    pub async fn request(self, s3: &S3) -> Result<Option<String>> {
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
                Some(etag) => Ok(Some(etag.to_str()?.to_string())),
                None => Ok(None),
            }
        } else {
            Err(response_error(response).await)
        }
    }
}

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html>
impl Action for PutObject<'_> {
    fn http_method(&self) -> Method {
        Method::PUT
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("content-type", self.content_type);
        Some(map)
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(self.key.split('/').collect())
    }
}
