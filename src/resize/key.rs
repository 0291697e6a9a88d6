//! Request keys: `<width>x<height>/<original key>`
//!
//! Each axis is either a run of ASCII digits or the marker `AUTO`.

use crate::error::{ResizeError, Result};
use std::{fmt, str::FromStr};

pub const AUTO: &str = "AUTO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Fixed(u32),
    Auto,
}

impl Dimension {
    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    #[must_use]
    pub const fn fixed(&self) -> Option<u32> {
        match self {
            Self::Fixed(n) => Some(*n),
            Self::Auto => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Auto => f.write_str(AUTO),
        }
    }
}

impl FromStr for Dimension {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self> {
        if s == AUTO {
            return Ok(Self::Auto);
        }

        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResizeError::MalformedKey(format!(
                "dimension must be digits or {AUTO}, got \"{s}\""
            )));
        }

        s.parse::<u32>()
            .map(Self::Fixed)
            .map_err(|_| ResizeError::MalformedKey(format!("dimension out of range: {s}")))
    }
}

/// A parsed request, immutable for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub width: Dimension,
    pub height: Dimension,
    pub original_key: String,
}

impl ResizeRequest {
    /// Parse a raw request key, a single leading `/` is ignored
    ///
    /// # Errors
    ///
    /// Will return `MalformedKey` if the key does not follow the grammar
    pub fn parse(raw: &str) -> Result<Self> {
        let key = raw.strip_prefix('/').unwrap_or(raw);

        let (dimensions, original_key) = key.split_once('/').ok_or_else(|| {
            ResizeError::MalformedKey(format!("expected <width>x<height>/<key>, got \"{raw}\""))
        })?;

        let (width, height) = dimensions.split_once('x').ok_or_else(|| {
            ResizeError::MalformedKey(format!("expected <width>x<height>, got \"{dimensions}\""))
        })?;

        if original_key.is_empty() {
            return Err(ResizeError::MalformedKey(format!(
                "missing original key in \"{raw}\""
            )));
        }

        // URL paths resolve dot segments, the object fetched and the one written would differ
        if original_key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(ResizeError::MalformedKey(format!(
                "dot segment in original key \"{original_key}\""
            )));
        }

        Ok(Self {
            width: width.parse()?,
            height: height.parse()?,
            original_key: original_key.to_string(),
        })
    }

    #[must_use]
    pub fn derived_key(&self) -> DerivedKey {
        DerivedKey(format!(
            "{}x{}/{}",
            self.width, self.height, self.original_key
        ))
    }

    /// `WxH` label used in logs
    #[must_use]
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl FromStr for ResizeRequest {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Storage key of the resized object, also the path of the redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedKey(String);

impl DerivedKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DerivedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
