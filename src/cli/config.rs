use crate::resize::OutputFormat;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs::File, path::Path};

/// `config.yml`, every key can be overridden from the command line or the environment
#[derive(Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub public_url: Option<String>,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub part_size: Option<usize>,
    pub max_dimension: Option<u32>,
}

impl Config {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be opened or parsed
    pub fn new(config_path: &Path) -> Result<Self> {
        let file = File::open(config_path)
            .with_context(|| format!("unable to open {}", config_path.display()))?;

        let config: Self =
            serde_yaml_ng::from_reader(file).context("unable to parse config file")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONF: &str = r"---
bucket: images
region: eu-central-2
access_key: XXX
secret_key: YYY
format: jpeg
quality: 70
max_dimension: 2048";

    const CONF_CUSTOM: &str = r"---
bucket: images
endpoint: http://127.0.0.1:9000
public_url: https://cdn.example.com";

    #[test]
    fn test_config() {
        let mut tmp_file = NamedTempFile::new().unwrap();
        tmp_file.write_all(CONF.as_bytes()).unwrap();
        let c = Config::new(tmp_file.path()).unwrap();
        assert_eq!(c.bucket.as_deref(), Some("images"));
        assert_eq!(c.region.as_deref(), Some("eu-central-2"));
        assert_eq!(c.access_key.as_deref(), Some("XXX"));
        assert_eq!(c.secret_key.as_deref(), Some("YYY"));
        assert_eq!(c.format, Some(OutputFormat::Jpeg));
        assert_eq!(c.quality, Some(70));
        assert_eq!(c.max_dimension, Some(2048));
        assert_eq!(c.part_size, None);
    }

    #[test]
    fn test_config_custom_endpoint() {
        let mut tmp_file = NamedTempFile::new().unwrap();
        tmp_file.write_all(CONF_CUSTOM.as_bytes()).unwrap();
        let c = Config::new(tmp_file.path()).unwrap();
        assert_eq!(c.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(c.public_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(c.region, None);
    }

    #[test]
    fn test_config_unknown_key() {
        let mut tmp_file = NamedTempFile::new().unwrap();
        tmp_file.write_all(b"hosts:\n  aws: {}\n").unwrap();
        assert!(Config::new(tmp_file.path()).is_err());
    }

    #[test]
    fn test_config_missing() {
        assert!(Config::new(Path::new("/nonexistent/config.yml")).is_err());
    }
}
