//! Mechanical artifact derivation for validated UbiSpec documents.
//!
//! Every generator is a pure, deterministic function of the validated spec
//! tree: decision tables, test-scenario matrices, validation checklists,
//! traceability matrices, topology graphs, integration-dependency
//! manifests, and command catalogs. Generators only accept specs through a
//! [`ValidatedSet`](ubispec_verify::ValidatedSet); documents with
//! outstanding errors yield [`DeriveError::NotValidated`]; advisories
//! never block.

pub mod catalog;
pub mod checklist;
pub mod decision_table;
pub mod deps;
pub mod error;
pub mod output;
pub mod scenario;
pub mod topology;
pub mod trace;

use ubispec_schema::LifecycleSpec;
use ubispec_verify::{SpecAccess, ValidatedSet};

pub use catalog::{command_catalog, CatalogRow, CommandCatalog};
pub use checklist::{checklist, AfterGroup, Checklist, ChecklistSection, IMPLICIT_FAILURE};
pub use decision_table::{decision_table, DecisionTable, RowKind, RowOutput, TableOptions, TableRow};
pub use deps::{dependency_manifest, CtxKind, DependencyManifest, DependencyRecord};
pub use error::DeriveError;
pub use output::{sentence_case, ArtifactFormat, ArtifactOutput};
pub use scenario::{scenarios, Scenario, ScenarioMatrix};
pub use topology::{topology, Edge, Node, NodeKind, TopologyGraph};
pub use trace::{
    event_assertions, forward_trace, impact, reverse_constraint_trace, CommandTrace, ReactionHop,
    SiteRole, TraceSite,
};

/// Resolve a lifecycle subject or refuse with the appropriate error.
pub(crate) fn subject_lifecycle<'a>(
    set: &'a ValidatedSet,
    decider: &str,
) -> Result<&'a LifecycleSpec, DeriveError> {
    match set.lifecycle_access(decider) {
        SpecAccess::Valid(spec) => Ok(spec),
        SpecAccess::Blocked => Err(DeriveError::NotValidated {
            subject: decider.to_string(),
        }),
        SpecAccess::Unknown => Err(DeriveError::UnknownSubject {
            subject: decider.to_string(),
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ubispec_core::Document;
    use ubispec_verify::{validate_documents, CrossOptions, NoModel};

    #[test]
    fn derivation_refuses_blocked_documents() {
        // The process dispatches a command the target decider does not
        // accept, so cross-validation blocks it; the lifecycle stays
        // derivable.
        let order = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    Then: OrderPlaced
    Outcome: [order-is-open]
"#;
        let broken = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Order]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: RestockShelf -> Order
    Outcome:
      - restocked
"#;
        let docs = vec![
            Document::from_yaml_str("order", order).unwrap(),
            Document::from_yaml_str("fulfillment", broken).unwrap(),
        ];
        let (report, validated) = validate_documents(&docs, &NoModel, &CrossOptions::default());
        assert!(report.has_errors());

        // Lifecycle-subject artifacts still derive.
        assert!(decision_table(&validated, "Order", "PlaceOrder", TableOptions::default()).is_ok());

        // The blocked process is invisible to set-level artifacts.
        assert!(topology(&validated).edges.is_empty());
        assert!(!command_catalog(&validated).rows[0].reacted_to);
    }
}
