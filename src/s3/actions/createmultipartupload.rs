//! Amazon S3 multipart upload limits
//! Maximum object size 5 TB
//! Maximum number of parts per upload  10,000
//! <https://docs.aws.amazon.com/AmazonS3/latest/dev/qfacts.html>

use crate::s3::{
    S3,
    actions::{Action, response_error},
    request,
    responses::InitiateMultipartUploadResult,
    tools,
};
use anyhow::Result;
use quick_xml::de::from_str;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct CreateMultipartUpload<'a> {
    key: &'a str,
    content_type: &'a str,
}

impl<'a> CreateMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, content_type: &'a str) -> Self {
        Self {
            key,
            content_type,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<InitiateMultipartUploadResult> {
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(""), None)?;

        let response = request::request(s3, url.clone(), self.http_method(), headers, None).await?;

        if response.status().is_success() {
            let upload_req: InitiateMultipartUploadResult = from_str(&response.text().await?)?;
            Ok(upload_req)
        } else {
            Err(response_error(response).await)
        }
    }
}

impl Action for CreateMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("content-type", self.content_type);
        Some(map)
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("uploads", "");
        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(self.key.split('/').collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::{Credentials, Region};
    use secrecy::SecretString;

    #[test]
    fn test_method() {
        let action = CreateMultipartUpload::new("key", "image/png");
        assert_eq!(Method::POST, action.http_method());
    }

    #[test]
    fn test_query_pairs() {
        let s3 = S3::new(
            &Credentials::new("access", &SecretString::new("secret".into())),
            &"eu-west-1".parse::<Region>().unwrap(),
            Some("bucket".to_string()),
        )
        .unwrap();
        let action = CreateMultipartUpload::new("400xAUTO/big.png", "image/png");
        let (url, headers) = action.sign(&s3, &tools::sha256_hex(""), None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://s3.eu-west-1.amazonaws.com/bucket/400xAUTO/big.png?uploads="
        );
        assert_eq!(headers.get("content-type").unwrap(), "image/png");
    }
}
