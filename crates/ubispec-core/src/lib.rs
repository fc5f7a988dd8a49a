//! Shared primitives for the UbiSpec specification language.
//!
//! UbiSpec documents describe event-sourced domain models at mixed levels of
//! precision. This crate defines the atomic value types every spec kind is
//! built from: the two lexical identifier classes ([`PascalIdent`],
//! [`KebabIdent`]), predicate expressions and entries, the fail-collecting
//! [`Issue`] diagnostic model, the `kind/vX.Y` format version literal, and
//! the raw [`Document`] loading layer (YAML or JSON front-end, uniform JSON
//! value tree, content digest).

pub mod document;
pub mod ident;
pub mod issue;
pub mod predicate;
pub mod version;

pub use document::{Document, DocumentError};
pub use ident::{IdentError, IdentKind, KebabIdent, PascalIdent};
pub use issue::{DocPath, Issue, IssueCode, PathSeg, Severity};
pub use predicate::{ConstraintList, DetailLevel, PredicateEntry, PredicateExpression};
pub use version::{FormatVersion, SpecKind, VersionError};
