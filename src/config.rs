use crate::resize::OutputFormat;

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Everything the handler needs, built once at start up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bucket: String,
    pub public_url: String,
    pub format: OutputFormat,
    pub quality: u8,
    pub max_dimension: u32,
}

impl Settings {
    #[must_use]
    pub fn new(bucket: &str, public_url: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub const fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Public URL of a stored object
    #[must_use]
    pub fn location(&self, key: &str) -> String {
        format!("{}/{key}", self.public_url)
    }
}
