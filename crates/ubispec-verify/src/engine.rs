//! The validation engine: documents in, report and validated set out.
//!
//! Per-document passes run independently (and could run in parallel);
//! cross-document validation runs once, after all of them, over the subset
//! of documents that individually passed.

use ubispec_core::{Document, DocPath, Issue, IssueCode, SpecKind};
use ubispec_schema::{parse_lifecycle, parse_process, parse_system};

use crate::cross::{cross_validate, CrossOptions};
use crate::fields::EventFieldLookup;
use crate::index::SpecSet;
use crate::report::{DocumentReport, ValidationReport};
use crate::validated::ValidatedSet;

/// Validate a set of loaded documents: every per-document pass, then the
/// cross-document pass over the survivors.
pub fn validate_documents(
    documents: &[Document],
    fields: &dyn EventFieldLookup,
    options: &CrossOptions,
) -> (ValidationReport, ValidatedSet) {
    let mut reports = Vec::with_capacity(documents.len());
    let mut set = SpecSet::new();

    for document in documents {
        let kind = document.kind();
        let issues = match kind {
            None => vec![Issue::new(
                IssueCode::MissingField,
                DocPath::root().field("ubispec"),
                "document has no readable 'ubispec' header",
            )
            .in_document(&document.name)],
            Some(SpecKind::Lifecycle) => match parse_lifecycle(&document.root) {
                Ok(parsed) => {
                    set.add_lifecycle(&document.name, parsed.spec);
                    parsed.advisories
                }
                Err(issues) => issues,
            },
            Some(SpecKind::Process) => match parse_process(&document.root) {
                Ok(parsed) => {
                    set.add_process(&document.name, parsed.spec);
                    parsed.advisories
                }
                Err(issues) => issues,
            },
            Some(SpecKind::System) => match parse_system(&document.root) {
                Ok(parsed) => {
                    set.set_system(&document.name, parsed.spec);
                    parsed.advisories
                }
                Err(issues) => issues,
            },
        };

        let issues: Vec<Issue> = issues
            .into_iter()
            .map(|issue| issue.in_document(&document.name))
            .collect();
        let excluded = issues.iter().any(|i| i.is_error());
        reports.push(DocumentReport {
            name: document.name.clone(),
            kind,
            digest: document.digest.clone(),
            issues,
            excluded,
        });
    }

    let cross = cross_validate(&set, fields, options);
    let report = ValidationReport::build(reports, cross);
    let validated = ValidatedSet::new(set, &report);
    (report, validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::NoModel;

    fn yaml(name: &str, text: &str) -> Document {
        Document::from_yaml_str(name, text).unwrap()
    }

    const ORDER: &str = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    Then: OrderPlaced
    Outcome: [order-is-open]
"#;

    const FULFILLMENT: &str = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Order]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: PlaceOrder -> Order
    Outcome:
      - replayed
"#;

    #[test]
    fn clean_set_validates_end_to_end() {
        let docs = vec![yaml("order", ORDER), yaml("fulfillment", FULFILLMENT)];
        let (report, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());
        assert!(!report.has_errors());
        assert!(validated.lifecycle("Order").is_some());
        assert!(validated.process("Fulfillment").is_some());
    }

    #[test]
    fn structurally_broken_document_is_excluded_not_dropped() {
        let broken = yaml("broken", "ubispec: lifecycle/v1.0\ndecider: not-pascal\n");
        let docs = vec![broken, yaml("fulfillment", FULFILLMENT)];
        let (report, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());

        let doc = report.documents.iter().find(|d| d.name == "broken").unwrap();
        assert!(doc.excluded);
        assert!(doc.has_errors());

        // The broken lifecycle never entered the set, so the process's
        // references to Order surface as cross-document issues.
        assert!(report
            .cross
            .iter()
            .any(|i| i.code == IssueCode::UnknownDecider));
        assert!(validated.lifecycle("Order").is_none());
    }

    #[test]
    fn headerless_document_is_reported() {
        let docs = vec![yaml("mystery", "decider: Order\n")];
        let (report, _) = validate_documents(&docs, &NoModel, &CrossOptions::default());
        let doc = &report.documents[0];
        assert!(doc.kind.is_none());
        assert!(doc.excluded);
        assert_eq!(doc.issues[0].code, IssueCode::MissingField);
    }

    #[test]
    fn cross_errors_block_derivation_for_the_offending_document() {
        let fulfillment = FULFILLMENT.replace("When: OrderPlaced", "When: OrderShipped");
        let docs = vec![yaml("order", ORDER), yaml("fulfillment", &fulfillment)];
        let (report, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());

        assert!(report
            .cross
            .iter()
            .any(|i| i.code == IssueCode::UnknownSourceEvent));
        assert!(!report.derivable("fulfillment"));
        assert!(report.derivable("order"));
        assert!(validated.process("Fulfillment").is_none());
        assert!(validated.lifecycle("Order").is_some());
    }
}
