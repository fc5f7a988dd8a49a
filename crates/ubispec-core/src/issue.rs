//! The fail-collecting diagnostic model.
//!
//! Validation problems are data, not `Err` values: every structural and
//! reference problem in a document is gathered into one list so authors fix
//! all issues in a single pass. Each issue carries the document identity,
//! the path within the document, and the offending identifier's text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four issue classes of the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Malformed document: missing field, wrong shape, pattern mismatch.
    /// Fatal; blocks all derivation for the document.
    Structural,
    /// Dangling reference within one document. Fatal for the document,
    /// collected alongside siblings.
    Reference,
    /// Reference to another document that does not resolve. Fatal for
    /// cross-validation but does not block single-document derivation.
    CrossDocument,
    /// Reported but never blocks derivation.
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Structural => write!(f, "STRUCTURAL"),
            Severity::Reference => write!(f, "REFERENCE"),
            Severity::CrossDocument => write!(f, "CROSS-DOC"),
            Severity::Advisory => write!(f, "ADVISORY"),
        }
    }
}

/// Every diagnostic code the validators can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    // Structural
    MissingField,
    TypeMismatch,
    PatternMismatch,
    InvalidIdentifier,
    MultiKeyInlinePredicate,
    UnsupportedVersion,
    WrongKind,
    // Reference
    DuplicateCommand,
    UnresolvedCommonReference,
    OutcomeKeyMismatch,
    MissingCorrelate,
    UndeclaredSource,
    UndeclaredTarget,
    MissingActor,
    UndeclaredModule,
    SelfFlow,
    DuplicateModule,
    // Cross-document
    UnknownSourceEvent,
    UnknownTargetCommand,
    UnknownDecider,
    MissingCorrelateField,
    // Advisory
    ExternalDecider,
    PotentialEmptyEmission,
    MissingOutcomeCoverage,
}

impl IssueCode {
    /// The severity class this code belongs to.
    pub fn severity(&self) -> Severity {
        use IssueCode::*;
        match self {
            MissingField | TypeMismatch | PatternMismatch | InvalidIdentifier
            | MultiKeyInlinePredicate | UnsupportedVersion | WrongKind => Severity::Structural,
            DuplicateCommand | UnresolvedCommonReference | OutcomeKeyMismatch
            | MissingCorrelate | UndeclaredSource | UndeclaredTarget | MissingActor
            | UndeclaredModule | SelfFlow | DuplicateModule => Severity::Reference,
            UnknownSourceEvent | UnknownTargetCommand | UnknownDecider
            | MissingCorrelateField => Severity::CrossDocument,
            ExternalDecider | PotentialEmptyEmission | MissingOutcomeCoverage => {
                Severity::Advisory
            }
        }
    }
}

/// One segment of a path into a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSeg {
    Field(String),
    Index(usize),
}

/// A path locating an issue within a document, e.g. `lifecycle[2].Then[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocPath(Vec<PathSeg>);

impl DocPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<PathSeg>) -> Self {
        Self(segments)
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathSeg::Field(name.into()));
        self
    }

    pub fn index(mut self, idx: usize) -> Self {
        self.0.push(PathSeg::Index(idx));
        self
    }

    pub fn segments(&self) -> &[PathSeg] {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<document>");
        }
        let mut first = true;
        for seg in &self.0 {
            match seg {
                PathSeg::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSeg::Index(idx) => write!(f, "[{idx}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

/// One collected diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    /// Document identity, filled in once the issue leaves per-document scope.
    pub document: Option<String>,
    /// Path within the document.
    pub path: DocPath,
    /// Human-readable description naming the offending identifier.
    pub message: String,
}

impl Issue {
    pub fn new(code: IssueCode, path: DocPath, message: impl Into<String>) -> Self {
        Self {
            code,
            document: None,
            path,
            message: message.into(),
        }
    }

    pub fn in_document(mut self, name: impl Into<String>) -> Self {
        self.document = Some(name.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// True for any severity that blocks derivation.
    pub fn is_error(&self) -> bool {
        self.severity() != Severity::Advisory
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.severity())?;
        if let Some(doc) = &self.document {
            write!(f, "{doc}: ")?;
        }
        write!(f, "{}: {} ({:?})", self.path, self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping() {
        assert_eq!(IssueCode::MissingField.severity(), Severity::Structural);
        assert_eq!(IssueCode::PatternMismatch.severity(), Severity::Structural);
        assert_eq!(IssueCode::OutcomeKeyMismatch.severity(), Severity::Reference);
        assert_eq!(IssueCode::MissingCorrelate.severity(), Severity::Reference);
        assert_eq!(IssueCode::UnknownSourceEvent.severity(), Severity::CrossDocument);
        assert_eq!(IssueCode::PotentialEmptyEmission.severity(), Severity::Advisory);
        assert_eq!(IssueCode::ExternalDecider.severity(), Severity::Advisory);
    }

    #[test]
    fn advisories_are_not_errors() {
        let issue = Issue::new(
            IssueCode::PotentialEmptyEmission,
            DocPath::root().field("lifecycle").index(0),
            "every Then entry is conditional",
        );
        assert!(!issue.is_error());
        let issue = Issue::new(IssueCode::DuplicateCommand, DocPath::root(), "dup");
        assert!(issue.is_error());
    }

    #[test]
    fn path_display() {
        let path = DocPath::root().field("lifecycle").index(2).field("Then").index(0);
        assert_eq!(path.to_string(), "lifecycle[2].Then[0]");
        assert_eq!(DocPath::root().to_string(), "<document>");
    }

    #[test]
    fn issue_display_names_document_and_path() {
        let issue = Issue::new(
            IssueCode::UnknownSourceEvent,
            DocPath::root().field("reactions").index(0).field("When"),
            "event 'OrderPlaced' is not declared by decider 'Order'",
        )
        .in_document("fulfillment-process");
        let text = issue.to_string();
        assert!(text.contains("CROSS-DOC"));
        assert!(text.contains("fulfillment-process"));
        assert!(text.contains("reactions[0].When"));
        assert!(text.contains("OrderPlaced"));
    }
}
