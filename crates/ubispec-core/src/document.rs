//! Raw document loading: YAML or JSON text into a uniform JSON value tree.
//!
//! Documents are parsed into `serde_json::Value` regardless of source
//! syntax, so the schema layer walks one shape. Each document carries a
//! SHA-256 digest of its raw text; the digest travels through validation
//! reports and artifacts so downstream consumers can detect staleness.

use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::version::{FormatVersion, SpecKind};

/// Errors from loading a raw document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported document extension: {path} (expected .yaml, .yml, or .json)")]
    UnsupportedExtension { path: PathBuf },
}

/// A loaded, not-yet-validated spec document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document identity used in reports: the file stem, or a caller-given name.
    pub name: String,
    /// Source path, when loaded from disk.
    pub source: Option<PathBuf>,
    /// Hex SHA-256 digest of the raw source text.
    pub digest: String,
    /// The parsed value tree.
    pub root: Value,
}

impl Document {
    /// Parse YAML text into a document.
    pub fn from_yaml_str(name: impl Into<String>, text: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_yaml::from_str(text)?;
        Ok(Self {
            name: name.into(),
            source: None,
            digest: digest_hex(text),
            root,
        })
    }

    /// Parse JSON text into a document.
    pub fn from_json_str(name: impl Into<String>, text: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_json::from_str(text)?;
        Ok(Self {
            name: name.into(),
            source: None,
            digest: digest_hex(text),
            root,
        })
    }

    /// Load a document from disk, choosing the front-end by extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc = match extension {
            "yaml" | "yml" => Self::from_yaml_str(name, &text)?,
            "json" => Self::from_json_str(name, &text)?,
            _ => {
                return Err(DocumentError::UnsupportedExtension {
                    path: path.to_path_buf(),
                })
            }
        };
        doc.source = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Peek at the `ubispec` header to see which kind of spec this claims to
    /// be, without validating anything else.
    pub fn kind(&self) -> Option<SpecKind> {
        let literal = self.root.get("ubispec")?.as_str()?;
        FormatVersion::parse(literal).ok().map(|v| v.kind)
    }
}

fn digest_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
