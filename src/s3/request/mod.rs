use crate::s3::S3;
use anyhow::Result;
use bytes::Bytes;
use reqwest::{
    Method, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::collections::BTreeMap;
use url::Url;

/// Send a signed request, `body` is sent as is (`content-length` is set by reqwest)
///
/// # Errors
///
/// Will return `Err` if a header is invalid or the request can not be sent
pub async fn request(
    s3: &S3,
    url: Url,
    method: Method,
    headers: &BTreeMap<String, String>,
    body: Option<Bytes>,
) -> Result<Response> {
    let headers = headers
        .iter()
        .map(|(k, v)| Ok((k.parse::<HeaderName>()?, v.parse::<HeaderValue>()?)))
        .collect::<Result<HeaderMap>>()?;

    log::debug!("{method} {url}");

    let request = s3.client().request(method, url).headers(headers);

    let request = match body {
        Some(body) => request.body(body),
        None => request,
    };

    Ok(request.send().await?)
}
