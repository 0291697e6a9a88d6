use anyhow::{Context, Result};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

// https://docs.aws.amazon.com/general/latest/gr/rande.html#regional-endpoints
const AWS_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

// signing region used by most S3 compatible stores when none is configured
const DEFAULT_SIGNING_REGION: &str = "us-east-1";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    // AWS region, endpoint s3.<name>.amazonaws.com
    Aws(String),

    // Custom region, endpoint (MinIO, Backblaze, Wasabi...)
    Custom { name: String, endpoint: String },
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Aws(name) => name,
            Self::Custom { name, .. } if name.is_empty() => DEFAULT_SIGNING_REGION,
            Self::Custom { name, .. } => name,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::Aws(name) if name.starts_with("cn-") => {
                format!("s3.{name}.amazonaws.com.cn")
            }
            Self::Aws(name) => format!("s3.{name}.amazonaws.com"),
            Self::Custom { endpoint, .. } => endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint as an URL, `https` unless the endpoint carries its own scheme
    ///
    /// # Errors
    ///
    /// Will return `Err` if the endpoint can not be parsed
    pub fn url(&self) -> Result<Url> {
        let endpoint = self.endpoint();
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("https://{endpoint}")
        };

        Url::parse(&url).with_context(|| format!("invalid endpoint: {url}"))
    }

    /// Public website URL of a bucket, only known for AWS regions
    #[must_use]
    pub fn website_url(&self, bucket: &str) -> Option<String> {
        match self {
            Self::Aws(name) => Some(format!("http://{bucket}.s3-website.{name}.amazonaws.com")),
            Self::Custom { .. } => None,
        }
    }
}

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = s.trim().to_lowercase();
        if AWS_REGIONS.contains(&v.as_str()) {
            Ok(Self::Aws(v))
        } else {
            Err(ParseRegionError::new(s))
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::Aws(DEFAULT_SIGNING_REGION.to_string())
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aws(name) => write!(f, "{name}"),
            Self::Custom { endpoint, .. } => write!(f, "{} ({endpoint})", self.name()),
        }
    }
}

/// An error produced when attempting to convert a `str` into a `Region` fails.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseRegionError {
    message: String,
}

impl ParseRegionError {
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            message: format!("Not a valid AWS region: {input}"),
        }
    }
}

impl Error for ParseRegionError {}

impl Display for ParseRegionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "foo".parse::<Region>().unwrap_err().to_string(),
            "Not a valid AWS region: foo"
        );
        assert_eq!(
            "eu-west-1".parse(),
            Ok(Region::Aws("eu-west-1".to_string()))
        );
        assert_eq!(
            "US-EAST-2".parse(),
            Ok(Region::Aws("us-east-2".to_string()))
        );
    }

    #[test]
    fn test_endpoint() {
        let region: Region = "eu-central-1".parse().unwrap();
        assert_eq!(region.endpoint(), "s3.eu-central-1.amazonaws.com");
        assert_eq!(
            region.url().unwrap().as_str(),
            "https://s3.eu-central-1.amazonaws.com/"
        );

        let region: Region = "cn-north-1".parse().unwrap();
        assert_eq!(region.endpoint(), "s3.cn-north-1.amazonaws.com.cn");
    }

    #[test]
    fn test_custom() {
        let region = Region::Custom {
            name: String::new(),
            endpoint: "http://localhost:9000/".to_string(),
        };
        assert_eq!(region.name(), "us-east-1");
        assert_eq!(region.endpoint(), "http://localhost:9000");
        assert_eq!(region.url().unwrap().as_str(), "http://localhost:9000/");
        assert_eq!(region.website_url("images"), None);

        let region = Region::Custom {
            name: "garage".to_string(),
            endpoint: "s3.example.com".to_string(),
        };
        assert_eq!(region.name(), "garage");
        assert_eq!(region.url().unwrap().as_str(), "https://s3.example.com/");
    }

    #[test]
    fn test_website_url() {
        let region: Region = "us-west-2".parse().unwrap();
        assert_eq!(
            region.website_url("images").unwrap(),
            "http://images.s3-website.us-west-2.amazonaws.com"
        );
    }
}
