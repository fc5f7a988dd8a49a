//! The aggregated validation report.
//!
//! One run over a document set produces one report: per-document structural
//! and reference issues, then cross-document issues, then advisories,
//! each tagged with document identity and path so an author can locate and
//! fix every problem in a single pass. Documents that failed structurally
//! are marked excluded from cross-document validation, never silently
//! dropped.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use ubispec_core::{Issue, Severity, SpecKind};

/// The validation outcome for one loaded document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub name: String,
    /// Claimed document kind, if the header was readable.
    pub kind: Option<SpecKind>,
    /// Hex SHA-256 digest of the raw source text.
    pub digest: String,
    pub issues: Vec<Issue>,
    /// Excluded from cross-document validation due to its own errors.
    pub excluded: bool,
}

impl DocumentReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.is_error())
    }
}

/// Issue counts for one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub documents: usize,
    pub excluded: usize,
    pub structural: usize,
    pub reference: usize,
    pub cross_document: usize,
    pub advisory: usize,
}

/// The complete aggregated report for a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub documents: Vec<DocumentReport>,
    pub cross: Vec<Issue>,
    pub summary: ReportSummary,
}

impl ValidationReport {
    /// Assemble the report and compute summary counts.
    pub fn build(documents: Vec<DocumentReport>, cross: Vec<Issue>) -> Self {
        let mut summary = ReportSummary {
            documents: documents.len(),
            excluded: documents.iter().filter(|d| d.excluded).count(),
            ..ReportSummary::default()
        };
        let all_issues = documents.iter().flat_map(|d| d.issues.iter()).chain(cross.iter());
        for issue in all_issues {
            match issue.severity() {
                Severity::Structural => summary.structural += 1,
                Severity::Reference => summary.reference += 1,
                Severity::CrossDocument => summary.cross_document += 1,
                Severity::Advisory => summary.advisory += 1,
            }
        }
        Self {
            documents,
            cross,
            summary,
        }
    }

    /// Whether any error-severity issue was found anywhere.
    pub fn has_errors(&self) -> bool {
        self.summary.structural > 0 || self.summary.reference > 0 || self.summary.cross_document > 0
    }

    /// Whether the run found nothing at all, advisories included.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && self.summary.advisory == 0
    }

    /// Whether derivation may run for the named document: no per-document
    /// errors and no cross-document errors attributed to it.
    pub fn derivable(&self, document: &str) -> bool {
        let doc_ok = self
            .documents
            .iter()
            .find(|d| d.name == document)
            .is_some_and(|d| !d.has_errors());
        let cross_ok = !self
            .cross
            .iter()
            .any(|i| i.is_error() && i.document.as_deref() == Some(document));
        doc_ok && cross_ok
    }

    /// Machine-readable rendering.
    pub fn to_json(&self) -> Value {
        json!({
            "summary": self.summary,
            "documents": self.documents.iter().map(|d| {
                json!({
                    "name": d.name,
                    "kind": d.kind.map(|k| k.as_str()),
                    "digest": d.digest,
                    "excluded": d.excluded,
                    "issues": d.issues.iter().map(issue_json).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
            "cross": self.cross.iter().map(issue_json).collect::<Vec<_>>(),
        })
    }
}

fn issue_json(issue: &Issue) -> Value {
    json!({
        "code": format!("{:?}", issue.code),
        "severity": issue.severity().to_string(),
        "document": issue.document,
        "path": issue.path.to_string(),
        "message": issue.message,
    })
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Validation Report ===")?;
        writeln!(
            f,
            "Documents: {} | Excluded: {} | Structural: {} | Reference: {} | Cross-document: {} | Advisory: {}",
            self.summary.documents,
            self.summary.excluded,
            self.summary.structural,
            self.summary.reference,
            self.summary.cross_document,
            self.summary.advisory,
        )?;

        for doc in &self.documents {
            let kind = doc.kind.map(|k| k.as_str()).unwrap_or("unknown");
            writeln!(f, "--- {} ({kind}) sha256:{} ---", doc.name, &doc.digest[..12])?;
            if doc.issues.is_empty() {
                writeln!(f, "ok")?;
            }
            for issue in &doc.issues {
                writeln!(f, "{issue}")?;
            }
            if doc.excluded {
                writeln!(f, "excluded from cross-document validation due to its errors")?;
            }
        }

        if !self.cross.is_empty() {
            writeln!(f, "--- Cross-document ---")?;
            for issue in &self.cross {
                writeln!(f, "{issue}")?;
            }
        }
        Ok(())
    }
}
