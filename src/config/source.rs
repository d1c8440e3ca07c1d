//! Configuration sources.
//!
//! A [`Source`] is one ordered unit of configuration input. Text sources carry
//! a payload that still needs decoding; fragment sources are already
//! structured (the in-process default or values derived from CLI flags).

use super::types::Config;
use crate::error::ConfigError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Text formats a source can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Hcl,
    Json,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Hcl => "hcl",
            Format::Json => "json",
        }
    }

    /// Format implied by a file extension. Matching is case-sensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "hcl" => Some(Format::Hcl),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    /// Format implied by the extension of `path`, if any.
    ///
    /// The extension is whatever follows the last `.` of the file name, so a
    /// dotfile such as `.json` counts as JSON.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ConfigError::UnsupportedFormat(s.to_string()))
    }
}

/// A named text payload: the contents of a file or a literal fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSource {
    /// File path or a descriptive label. Used in error messages.
    pub name: String,
    /// Declared format. When unset the extension of `name` decides.
    pub format: Option<Format>,
    pub data: String,
}

impl TextSource {
    /// The declared format, falling back to the one implied by `name`.
    pub fn effective_format(&self) -> Option<Format> {
        self.format.or_else(|| Format::from_path(Path::new(&self.name)))
    }
}

/// One unit of configuration input.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Text that must be decoded before merging.
    Text(TextSource),
    /// An already structured fragment.
    Fragment { name: String, config: Config },
}

impl Source {
    pub fn text(name: impl Into<String>, format: Format, data: impl Into<String>) -> Self {
        Source::Text(TextSource {
            name: name.into(),
            format: Some(format),
            data: data.into(),
        })
    }

    pub fn fragment(name: impl Into<String>, config: Config) -> Self {
        Source::Fragment {
            name: name.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Source::Text(text) => &text.name,
            Source::Fragment { name, .. } => name,
        }
    }
}
