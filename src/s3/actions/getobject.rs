use crate::s3::{
    S3,
    actions::{Action, response_error},
    request, tools,
};
use anyhow::Result;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct GetObject<'a> {
    key: &'a str,
}

impl<'a> GetObject<'a> {
    #[must_use]
    pub const fn new(key: &'a str) -> Self {
        Self { key }
    }

    /// The response is returned before the body is read, consume it with
    /// `bytes_stream()` to keep memory bounded.
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or S3 answers with an error
    pub async fn request(&self, s3: &S3) -> Result<reqwest::Response> {
        let (url, headers) = &self.sign(s3, &tools::sha256_hex(""), None)?;
        let response = request::request(s3, url.clone(), self.http_method(), headers, None).await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response_error(response).await)
        }
    }
}

impl Action for GetObject<'_> {
    fn http_method(&self) -> Method {
        Method::GET
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn path(&self) -> Option<Vec<&str>> {
        Some(self.key.split('/').collect())
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::{Credentials, Region};
    use secrecy::SecretString;

    #[test]
    fn test_method() {
        let action = GetObject::new("key");
        assert_eq!(Method::GET, action.http_method());
    }

    #[test]
    fn test_sign_encodes_key() {
        let s3 = S3::new(
            &Credentials::new("access", &SecretString::new("secret".into())),
            &"us-west-1".parse::<Region>().unwrap(),
            Some("images".to_string()),
        )
        .unwrap();
        let action = GetObject::new("photos/my cat+dog.jpg");
        let (url, headers) = action.sign(&s3, &tools::sha256_hex(""), None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://s3.us-west-1.amazonaws.com/images/photos/my%20cat%2Bdog.jpg"
        );
        assert_eq!(headers.get("host").unwrap(), "s3.us-west-1.amazonaws.com");
    }
}
