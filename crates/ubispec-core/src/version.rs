//! The `ubispec` format-version literal: `"<kind>/v<major>.<minor>"`.
//!
//! Minor bumps add optional fields only, so older documents remain valid;
//! major bumps may change required fields and need explicit migration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three document kinds of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecKind {
    Lifecycle,
    Process,
    System,
}

impl SpecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecKind::Lifecycle => "lifecycle",
            SpecKind::Process => "process",
            SpecKind::System => "system",
        }
    }

    fn from_str(text: &str) -> Option<Self> {
        match text {
            "lifecycle" => Some(SpecKind::Lifecycle),
            "process" => Some(SpecKind::Process),
            "system" => Some(SpecKind::System),
            _ => None,
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from parsing a format-version literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("malformed format version '{0}': expected '<kind>/v<major>.<minor>'")]
    Malformed(String),

    #[error("unknown document kind '{0}': expected lifecycle, process, or system")]
    UnknownKind(String),
}

/// A parsed format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatVersion {
    pub kind: SpecKind,
    pub major: u8,
    pub minor: u8,
}

impl FormatVersion {
    /// Current version for each document kind.
    pub const fn current(kind: SpecKind) -> Self {
        Self {
            kind,
            major: 1,
            minor: 0,
        }
    }

    /// Parse the literal, e.g. `"lifecycle/v1.0"`.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let (kind_text, version_text) = text
            .split_once('/')
            .ok_or_else(|| VersionError::Malformed(text.to_string()))?;
        let kind = SpecKind::from_str(kind_text)
            .ok_or_else(|| VersionError::UnknownKind(kind_text.to_string()))?;
        let numbers = version_text
            .strip_prefix('v')
            .ok_or_else(|| VersionError::Malformed(text.to_string()))?;
        let (major_text, minor_text) = numbers
            .split_once('.')
            .ok_or_else(|| VersionError::Malformed(text.to_string()))?;
        let major: u8 = major_text
            .parse()
            .map_err(|_| VersionError::Malformed(text.to_string()))?;
        let minor: u8 = minor_text
            .parse()
            .map_err(|_| VersionError::Malformed(text.to_string()))?;
        Ok(Self { kind, major, minor })
    }

    /// Check whether a document at this version can be read by the current
    /// implementation: same major, minor no newer than what we know.
    pub fn is_supported(&self) -> bool {
        let current = Self::current(self.kind);
        self.major == current.major && self.minor <= current.minor
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}.{}", self.kind, self.major, self.minor)
    }
}
