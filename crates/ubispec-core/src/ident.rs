//! The two lexical identifier classes used throughout UbiSpec documents.
//!
//! Commands, events, deciders, processes, and modules are `PascalCase`;
//! predicate, constraint, and assertion names are `kebab-case` so they read
//! as natural language. Class membership is enforced at construction; the
//! two classes never mix.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which lexical class an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentKind {
    /// `^[A-Z][a-zA-Z0-9]*$`: commands, events, deciders, processes, modules.
    Pascal,
    /// `^[a-z][a-z0-9]*(-[a-z0-9]+)*$`: predicates, constraints, assertions.
    Kebab,
}

impl IdentKind {
    /// Check whether `text` matches this class's pattern.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            IdentKind::Pascal => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(c) if c.is_ascii_uppercase() => {}
                    _ => return false,
                }
                chars.all(|c| c.is_ascii_alphanumeric())
            }
            IdentKind::Kebab => {
                if text.is_empty() {
                    return false;
                }
                let mut first_segment = true;
                for segment in text.split('-') {
                    let mut chars = segment.chars();
                    let head = match chars.next() {
                        Some(c) => c,
                        None => return false,
                    };
                    if first_segment {
                        if !head.is_ascii_lowercase() {
                            return false;
                        }
                        first_segment = false;
                    } else if !head.is_ascii_lowercase() && !head.is_ascii_digit() {
                        return false;
                    }
                    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Human-readable name of the class for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            IdentKind::Pascal => "PascalCase",
            IdentKind::Kebab => "kebab-case",
        }
    }
}

/// Failure to construct an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("'{text}' does not match the {} pattern", .kind.describe())]
    PatternMismatch { kind: IdentKind, text: String },
}

/// A `PascalCase` identifier: command, event, decider, process, or module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PascalIdent(String);

impl PascalIdent {
    /// Parse a Pascal identifier, rejecting anything outside the class.
    pub fn parse(text: &str) -> Result<Self, IdentError> {
        if IdentKind::Pascal.matches(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(IdentError::PatternMismatch {
                kind: IdentKind::Pascal,
                text: text.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PascalIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `kebab-case` identifier: predicate, constraint, or assertion name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KebabIdent(String);

impl KebabIdent {
    /// Parse a kebab identifier, rejecting anything outside the class.
    pub fn parse(text: &str) -> Result<Self, IdentError> {
        if IdentKind::Kebab.matches(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(IdentError::PatternMismatch {
                kind: IdentKind::Kebab,
                text: text.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KebabIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
