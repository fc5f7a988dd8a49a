//! The validated-set handle that gates derivation.
//!
//! Derivation must refuse to run on any document with outstanding
//! structural, reference, or cross-document errors. This handle admits only
//! derivable documents; blocked ones stay queryable so callers can report
//! *why* a subject is unavailable instead of claiming it does not exist.

use std::collections::BTreeSet;

use ubispec_schema::{LifecycleSpec, ProcessSpec, SystemSpec};

use crate::index::SpecSet;
use crate::report::ValidationReport;

/// Outcome of looking up a spec through the validated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecAccess<'a, T> {
    /// The spec is derivable.
    Valid(&'a T),
    /// The spec exists but its document has outstanding errors.
    Blocked,
    /// No spec of this name is in the set.
    Unknown,
}

impl<'a, T> SpecAccess<'a, T> {
    pub fn valid(self) -> Option<&'a T> {
        match self {
            SpecAccess::Valid(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Specs whose documents passed validation, plus the names of those that
/// did not.
#[derive(Debug, Clone)]
pub struct ValidatedSet {
    set: SpecSet,
    blocked: BTreeSet<String>,
}

impl ValidatedSet {
    /// Partition the set by the report's per-document verdicts.
    pub fn new(set: SpecSet, report: &ValidationReport) -> Self {
        let blocked = report
            .documents
            .iter()
            .filter(|doc| !report.derivable(&doc.name))
            .map(|doc| doc.name.clone())
            .collect();
        Self { set, blocked }
    }

    fn is_blocked(&self, document: &str) -> bool {
        self.blocked.contains(document)
    }

    pub fn lifecycle(&self, decider: &str) -> Option<&LifecycleSpec> {
        match self.lifecycle_access(decider) {
            SpecAccess::Valid(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn lifecycle_access(&self, decider: &str) -> SpecAccess<'_, LifecycleSpec> {
        match self.set.lifecycle(decider) {
            None => SpecAccess::Unknown,
            Some(entry) if self.is_blocked(&entry.document) => SpecAccess::Blocked,
            Some(entry) => SpecAccess::Valid(&entry.spec),
        }
    }

    pub fn process(&self, name: &str) -> Option<&ProcessSpec> {
        match self.process_access(name) {
            SpecAccess::Valid(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn process_access(&self, name: &str) -> SpecAccess<'_, ProcessSpec> {
        match self.set.process(name) {
            None => SpecAccess::Unknown,
            Some(entry) if self.is_blocked(&entry.document) => SpecAccess::Blocked,
            Some(entry) => SpecAccess::Valid(&entry.spec),
        }
    }

    pub fn system(&self) -> Option<&SystemSpec> {
        self.set
            .system()
            .filter(|entry| !self.is_blocked(&entry.document))
            .map(|entry| &entry.spec)
    }

    /// Every derivable lifecycle spec, in decider-name order.
    pub fn lifecycles(&self) -> impl Iterator<Item = &LifecycleSpec> {
        self.set
            .lifecycles()
            .filter(|entry| !self.is_blocked(&entry.document))
            .map(|entry| &entry.spec)
    }

    /// Every derivable process spec, in process-name order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessSpec> {
        self.set
            .processes()
            .filter(|entry| !self.is_blocked(&entry.document))
            .map(|entry| &entry.spec)
    }

    /// Documents excluded from derivation.
    pub fn blocked_documents(&self) -> impl Iterator<Item = &str> {
        self.blocked.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross::CrossOptions;
    use crate::engine::validate_documents;
    use crate::fields::NoModel;
    use ubispec_core::Document;

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

    #[test]
    fn valid_documents_are_accessible() {
        let docs = vec![Document::from_yaml_str("order", ORDER).unwrap()];
        let (_, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());
        assert!(matches!(validated.lifecycle_access("Order"), SpecAccess::Valid(_)));
        assert!(matches!(validated.lifecycle_access("Ghost"), SpecAccess::Unknown));
        assert_eq!(validated.lifecycles().count(), 1);
        assert_eq!(validated.blocked_documents().count(), 0);
    }

    #[test]
    fn blocked_documents_are_distinguished_from_unknown() {
        // A process referencing a decider that has no document: the
        // cross-document error blocks the process itself.
        let process = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Ghost]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: HauntWarehouse -> Ghost
    Outcome:
      - haunted
"#;
        let docs = vec![
            Document::from_yaml_str("order", ORDER).unwrap(),
            Document::from_yaml_str("fulfillment", process).unwrap(),
        ];
        let (report, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());
        assert!(report.has_errors());
        assert!(matches!(validated.process_access("Fulfillment"), SpecAccess::Blocked));
        assert!(matches!(validated.process_access("Nothing"), SpecAccess::Unknown));
        assert!(validated.process("Fulfillment").is_none());
        assert_eq!(validated.blocked_documents().collect::<Vec<_>>(), vec!["fulfillment"]);
    }
}
