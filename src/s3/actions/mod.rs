//! Actions
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/API_Operations.html>

use crate::s3::{
    S3,
    responses::ErrorResponse,
    signature::{Signature, UNRESERVED},
};
use anyhow::{Result, anyhow};
use percent_encoding::utf8_percent_encode;
use quick_xml::de::from_str;
use reqwest::{Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_GetObject.html>
mod getobject;
pub use self::getobject::GetObject;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html>
mod putobject;
pub use self::putobject::PutObject;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CreateMultipartUpload.html>
mod createmultipartupload;
pub use self::createmultipartupload::CreateMultipartUpload;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_UploadPart.html>
mod uploadpart;
pub use self::uploadpart::UploadPart;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CompleteMultipartUpload.html>
mod completemultipartupload;
pub use self::completemultipartupload::{CompleteMultipartUpload, Part};

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_AbortMultipartUpload.html>
mod abortmultipartupload;
pub use self::abortmultipartupload::AbortMultipartUpload;

pub trait Action {
    // headers to send in the request
    fn headers(&self) -> Option<BTreeMap<&str, &str>>;

    // method to use GET/PUT...
    fn http_method(&self) -> Method;

    // URL query pairs
    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>>;

    // URL path
    fn path(&self) -> Option<Vec<&str>>;

    /// # Errors
    ///
    /// Will return `Err` if the endpoint is not a valid URL
    fn sign(
        &self,
        s3: &S3,
        hash_payload: &str,
        md5: Option<&str>,
    ) -> Result<(Url, BTreeMap<String, String>)> {
        let mut url = s3.endpoint()?;

        // object key, every segment URI-encoded once so the canonical URI is the path as sent
        if let Some(path) = self.path() {
            let mut full_path = url.path().trim_end_matches('/').to_string();
            for segment in path {
                full_path.push('/');
                full_path.push_str(&utf8_percent_encode(segment, UNRESERVED).to_string());
            }
            url.set_path(&full_path);
        }

        if let Some(pairs) = &self.query_pairs() {
            for (k, v) in pairs {
                url.query_pairs_mut().append_pair(k, v);
            }
        }

        let mut signature = Signature::new(s3, "s3", self.http_method());
        let headers = signature.sign(&url, hash_payload, md5, self.headers());
        Ok((url, headers))
    }
}

/// A non 2xx answer from S3, kept typed so callers can tell a missing key from an outage.
#[derive(Debug, Clone)]
pub struct ResponseError {
    pub status: StatusCode,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
}

impl ResponseError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
            || matches!(self.code.as_deref(), Some("NoSuchKey" | "NoSuchBucket"))
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP Status Code: {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, ", Code: {code}")?;
        }
        if !self.message.is_empty() {
            write!(f, ", Message: {}", self.message)?;
        }
        if let Some(rid) = &self.request_id {
            write!(f, ", Request ID: {rid}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResponseError {}

/// Turn an unsuccessful response into an `anyhow::Error` wrapping [`ResponseError`]
pub async fn response_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let header_request_id = response
        .headers()
        .get("x-amz-request-id")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    // HEAD like answers and some proxies have no body
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return anyhow!(e).context(format!("HTTP Status Code: {status}")),
    };

    let error = match from_str::<ErrorResponse>(&body) {
        Ok(e) => ResponseError {
            status,
            code: Some(e.code),
            message: e.message,
            request_id: e.request_id.or(header_request_id),
        },
        Err(_) => ResponseError {
            status,
            code: None,
            message: body.trim().to_string(),
            request_id: header_request_id,
        },
    };

    anyhow!(error)
}
