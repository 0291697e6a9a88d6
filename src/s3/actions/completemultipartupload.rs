use crate::s3::{
    S3,
    actions::{Action, response_error},
    request,
    responses::CompleteMultipartUploadResult,
    tools,
};
use anyhow::Result;
use bytes::Bytes;
use quick_xml::{de::from_str, se::to_string};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "PartNumber")]
    pub number: u16,
}

#[derive(Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
struct CompleteMultipartUploadBody<'a> {
    #[serde(rename = "Part")]
    parts: &'a [Part],
}

#[derive(Debug)]
pub struct CompleteMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
    parts: &'a [Part],
}

impl<'a> CompleteMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str, parts: &'a [Part]) -> Self {
        Self {
            key,
            upload_id,
            parts,
        }
    }

    /// Request body, the parts in ascending order
    ///
    /// # Errors
    ///
    /// Will return `Err` if the parts can not be serialized
    pub fn body(&self) -> Result<String> {
        Ok(to_string(&CompleteMultipartUploadBody { parts: self.parts })?)
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3) -> Result<CompleteMultipartUploadResult> {
        let body = self.body()?;
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(&body), None)?;

        let response = request::request(
            s3,
            url.clone(),
            self.http_method(),
            headers,
            Some(Bytes::from(body)),
        )
        .await?;

        if response.status().is_success() {
            // S3 may answer 200 with an <Error> body when the completion fails late
            let text = response.text().await?;
            match from_str::<CompleteMultipartUploadResult>(&text) {
                Ok(result) => Ok(result),
                Err(e) => Err(anyhow::anyhow!(
                    "unexpected CompleteMultipartUpload response: {e}: {text}"
                )),
            }
        } else {
            Err(response_error(response).await)
        }
    }
}

impl Action for CompleteMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("content-type", "application/xml");
        Some(map)
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("uploadId", self.upload_id);
        Some(map)
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(self.key.split('/').collect())
    }
}
