//! Cross-document consistency checks.
//!
//! These checks resolve the soft name references between Process and
//! Lifecycle documents that no single document can verify alone. They run
//! only over documents that individually passed structural validation.

use ubispec_core::{DocPath, Issue, IssueCode};
use ubispec_schema::Trigger;

use crate::fields::{EventFieldLookup, FieldPresence};
use crate::index::SpecSet;

/// How to treat a decider named in `reacts_to`/`emits_to` that has no
/// Lifecycle document in the validated set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExternalDeciderPolicy {
    /// Hard error: every named decider must have a document in the set.
    #[default]
    Deny,
    /// Advisory only: the decider is assumed to live in another bounded
    /// context.
    Allow,
}

/// Options for a cross-validation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossOptions {
    pub external_deciders: ExternalDeciderPolicy,
}

/// Run every cross-document check over the set, collecting all issues.
pub fn cross_validate(
    set: &SpecSet,
    fields: &dyn EventFieldLookup,
    options: &CrossOptions,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for entry in set.processes() {
        let spec = &entry.spec;

        // Named deciders must resolve to documents, or be tolerated as
        // external per policy.
        for (field, deciders) in [("reacts_to", &spec.reacts_to), ("emits_to", &spec.emits_to)] {
            for (idx, decider) in deciders.iter().enumerate() {
                if set.has_decider(decider.as_str()) {
                    continue;
                }
                let path = DocPath::root().field(field).index(idx);
                let issue = match options.external_deciders {
                    ExternalDeciderPolicy::Deny => Issue::new(
                        IssueCode::UnknownDecider,
                        path,
                        format!("decider '{decider}' has no Lifecycle document in the validated set"),
                    ),
                    ExternalDeciderPolicy::Allow => Issue::new(
                        IssueCode::ExternalDecider,
                        path,
                        format!("decider '{decider}' is treated as external to this system"),
                    ),
                };
                issues.push(issue.in_document(&entry.document));
            }
        }

        for (idx, reaction) in spec.reactions.iter().enumerate() {
            let reaction_path = DocPath::root().field("reactions").index(idx);

            // Trigger events must be declared by their source decider.
            for (event, source) in reaction.when.event_sources() {
                let Some(events) = set.decider_events(source.as_str()) else {
                    continue; // unknown decider already reported above
                };
                if !events.contains(event.as_str()) {
                    issues.push(
                        Issue::new(
                            IssueCode::UnknownSourceEvent,
                            reaction_path.clone().field("When"),
                            format!("event '{event}' is not declared by decider '{source}'"),
                        )
                        .in_document(&entry.document),
                    );
                }
            }

            // Dispatched commands must be accepted by their target decider.
            for (dispatch_idx, dispatch) in reaction.then.iter().enumerate() {
                let Some(commands) = set.decider_commands(dispatch.target.as_str()) else {
                    continue;
                };
                if !commands.contains(dispatch.command.as_str()) {
                    issues.push(
                        Issue::new(
                            IssueCode::UnknownTargetCommand,
                            reaction_path.clone().field("Then").index(dispatch_idx),
                            format!(
                                "command '{}' is not accepted by decider '{}'",
                                dispatch.command, dispatch.target
                            ),
                        )
                        .in_document(&entry.document),
                    );
                }
            }

            // The correlate field must exist on every joined event payload.
            if let Trigger::All { entries, correlate } = &reaction.when {
                for all_entry in entries {
                    match fields.field(all_entry.event.as_str(), correlate) {
                        FieldPresence::Absent => {
                            issues.push(
                                Issue::new(
                                    IssueCode::MissingCorrelateField,
                                    reaction_path.clone().field("When"),
                                    format!(
                                        "event '{}' does not declare the correlate field '{correlate}'",
                                        all_entry.event
                                    ),
                                )
                                .in_document(&entry.document),
                            );
                        }
                        FieldPresence::Present | FieldPresence::Unknown => {}
                    }
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{NoModel, StaticFieldIndex};
    use ubispec_core::Document;
    use ubispec_schema::{parse_lifecycle, parse_process};

    const ORDER: &str = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    Then: OrderPlaced
    Outcome: [order-is-open]
  - When: CancelOrder
    Then: OrderCancelled
    Outcome: [order-is-cancelled]
"#;

    const INVENTORY: &str = r#"
ubispec: lifecycle/v1.0
decider: Inventory
identity: sku
model: ./m.ts
lifecycle:
  - When: ReserveStock
    Then: StockReserved
    Outcome: [stock-is-reserved]
"#;

    const FULFILLMENT: &str = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Inventory]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: ReserveStock -> Inventory
    Outcome:
      - reservation-requested
"#;

    fn build_set(lifecycles: &[&str], processes: &[&str]) -> SpecSet {
        let mut set = SpecSet::new();
        for (idx, text) in lifecycles.iter().enumerate() {
            let doc = Document::from_yaml_str(format!("lifecycle-{idx}"), text).unwrap();
            let spec = parse_lifecycle(&doc.root).unwrap().spec;
            set.add_lifecycle(doc.name, spec);
        }
        for (idx, text) in processes.iter().enumerate() {
            let doc = Document::from_yaml_str(format!("process-{idx}"), text).unwrap();
            let spec = parse_process(&doc.root).unwrap().spec;
            set.add_process(doc.name, spec);
        }
        set
    }

    #[test]
    fn consistent_set_is_clean() {
        let set = build_set(&[ORDER, INVENTORY], &[FULFILLMENT]);
        let issues = cross_validate(&set, &NoModel, &CrossOptions::default());
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn removing_the_event_yields_exactly_one_unknown_source_event() {
        let order_without_placed = ORDER.replace("Then: OrderPlaced", "Then: OrderAccepted");
        let set = build_set(&[&order_without_placed, INVENTORY], &[FULFILLMENT]);
        let issues = cross_validate(&set, &NoModel, &CrossOptions::default());
        let unknown: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::UnknownSourceEvent)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].message.contains("OrderPlaced"));
        assert!(unknown[0].message.contains("Order"));
    }

    #[test]
    fn unknown_target_command_reported() {
        let inventory_without_reserve = INVENTORY.replace("When: ReserveStock", "When: RestockItem");
        let set = build_set(&[ORDER, &inventory_without_reserve], &[FULFILLMENT]);
        let issues = cross_validate(&set, &NoModel, &CrossOptions::default());
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::UnknownTargetCommand
                && i.message.contains("ReserveStock")));
    }

    #[test]
    fn missing_decider_follows_policy() {
        let set = build_set(&[ORDER], &[FULFILLMENT]); // Inventory document absent

        let issues = cross_validate(&set, &NoModel, &CrossOptions::default());
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::UnknownDecider && i.message.contains("Inventory")));

        let allow = CrossOptions {
            external_deciders: ExternalDeciderPolicy::Allow,
        };
        let issues = cross_validate(&set, &NoModel, &allow);
        assert!(issues.iter().all(|i| i.code != IssueCode::UnknownDecider));
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::ExternalDecider && !i.is_error()));
    }

    const SETTLEMENT: &str = r#"
ubispec: process/v1.0
process: Settlement
reacts_to: [Order, Inventory]
emits_to: [Order]
model: ./m.ts
reactions:
  - When:
      all:
        - OrderPlaced from Order
        - StockReserved from Inventory
    correlate: orderId
    Then: CancelOrder -> Order
    Outcome:
      - settled
"#;

    #[test]
    fn correlate_field_checked_against_model() {
        let set = build_set(&[ORDER, INVENTORY], &[SETTLEMENT]);

        // Without a model, the check is skipped.
        let issues = cross_validate(&set, &NoModel, &CrossOptions::default());
        assert!(issues.iter().all(|i| i.code != IssueCode::MissingCorrelateField));

        // With a model that lacks the field on one event, exactly that
        // event is reported.
        let mut index = StaticFieldIndex::new();
        index.declare("OrderPlaced", ["orderId", "customerId"]);
        index.declare("StockReserved", ["sku"]);
        let issues = cross_validate(&set, &index, &CrossOptions::default());
        let missing: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::MissingCorrelateField)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains("StockReserved"));
    }
}
