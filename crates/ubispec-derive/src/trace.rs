//! Traceability derivation: forward traces, reverse traces, and impact
//! analysis over the validated set.

use serde::Serialize;
use serde_json::json;

use ubispec_schema::OutcomeSpec;
use ubispec_verify::ValidatedSet;

use crate::error::DeriveError;
use crate::output::ArtifactOutput;
use crate::subject_lifecycle;

/// One reaction reached by a forward trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionHop {
    pub process: String,
    /// The trigger event that matched.
    pub event: String,
    /// Dispatches of that reaction, in `Command -> Decider` form.
    pub dispatches: Vec<String>,
}

/// The forward trace of one command: the events it emits and every
/// reaction those events trigger.
#[derive(Debug, Clone, Serialize)]
pub struct CommandTrace {
    pub decider: String,
    pub command: String,
    pub events: Vec<String>,
    pub hops: Vec<ReactionHop>,
}

impl CommandTrace {
    pub fn output(&self) -> ArtifactOutput {
        let mut text = format!("## Trace: {} / {}\n\n", self.decider, self.command);
        text.push_str(&format!("Events: {}\n", self.events.join(", ")));
        for hop in &self.hops {
            text.push_str(&format!(
                "- {} reacts to {} and dispatches: {}\n",
                hop.process,
                hop.event,
                hop.dispatches.join(", ")
            ));
        }
        let data = json!({
            "artifact": "trace",
            "decider": self.decider,
            "command": self.command,
            "events": self.events,
            "hops": self.hops,
        });
        ArtifactOutput { text, data }
    }
}

/// Forward trace: Command → Events → Reactions → Dispatched commands.
pub fn forward_trace(
    set: &ValidatedSet,
    decider: &str,
    command: &str,
) -> Result<CommandTrace, DeriveError> {
    let spec = subject_lifecycle(set, decider)?;
    let decision = spec.decision(command).ok_or_else(|| DeriveError::UnknownCommand {
        decider: decider.to_string(),
        command: command.to_string(),
    })?;

    let events: Vec<String> = decision
        .then
        .iter()
        .map(|entry| entry.event().as_str().to_string())
        .collect();

    let mut hops = Vec::new();
    for process in set.processes() {
        for reaction in &process.reactions {
            for (event, source) in reaction.when.event_sources() {
                if source.as_str() != decider || !events.iter().any(|e| e.as_str() == event.as_str()) {
                    continue;
                }
                let hop = ReactionHop {
                    process: process.process.as_str().to_string(),
                    event: event.as_str().to_string(),
                    dispatches: reaction.then.iter().map(|d| d.outcome_key()).collect(),
                };
                if !hops.contains(&hop) {
                    hops.push(hop);
                }
            }
        }
    }

    Ok(CommandTrace {
        decider: decider.to_string(),
        command: command.to_string(),
        events,
        hops,
    })
}

/// Where a traced name occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteRole {
    Constraint,
    ThenEntry,
    OutcomeKey,
}

/// One structural location referencing a traced name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceSite {
    /// Decider or process name owning the location.
    pub owner: String,
    /// Path-like location inside the owner, e.g. `ApproveRegistry.And`.
    pub location: String,
    pub role: SiteRole,
}

/// Reverse trace: every Decision and Reaction whose `And` contains the
/// named constraint.
pub fn reverse_constraint_trace(set: &ValidatedSet, constraint: &str) -> Vec<TraceSite> {
    let mut sites = Vec::new();
    for spec in set.lifecycles() {
        for decision in &spec.lifecycle {
            if let Some(and) = &decision.and {
                if and.names().any(|n| n.as_str() == constraint) {
                    sites.push(TraceSite {
                        owner: spec.decider.as_str().to_string(),
                        location: format!("{}.And", decision.when),
                        role: SiteRole::Constraint,
                    });
                }
            }
        }
    }
    for spec in set.processes() {
        for (idx, reaction) in spec.reactions.iter().enumerate() {
            if let Some(and) = &reaction.and {
                if and.names().any(|n| n.as_str() == constraint) {
                    sites.push(TraceSite {
                        owner: spec.process.as_str().to_string(),
                        location: format!("reactions[{idx}].And"),
                        role: SiteRole::Constraint,
                    });
                }
            }
        }
    }
    sites
}

/// Assertion names attached to an event through keyed `Outcome` sections.
pub fn event_assertions(set: &ValidatedSet, event: &str) -> Vec<String> {
    let mut names = Vec::new();
    for spec in set.lifecycles() {
        for decision in &spec.lifecycle {
            if let OutcomeSpec::Keyed { cases, .. } = &decision.outcome {
                for case in cases.iter().filter(|case| case.key == event) {
                    for assertion in &case.assertions {
                        let name = assertion.name().as_str().to_string();
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
            }
        }
    }
    names
}

/// Impact analysis: every structural location referencing `name` textually,
/// over constraint lists, `Then` keys, and `Outcome` keys.
pub fn impact(set: &ValidatedSet, name: &str) -> Vec<TraceSite> {
    let mut sites = Vec::new();

    for spec in set.lifecycles() {
        let owner = spec.decider.as_str();
        for decision in &spec.lifecycle {
            let command = decision.when.as_str();
            if let Some(and) = &decision.and {
                if and.names().any(|n| n.as_str() == name) {
                    sites.push(site(owner, format!("{command}.And"), SiteRole::Constraint));
                }
            }
            for entry in &decision.then {
                let mentions_condition = entry
                    .conditions()
                    .is_some_and(|list| list.names().any(|n| n.as_str() == name));
                if entry.event().as_str() == name {
                    sites.push(site(owner, format!("{command}.Then"), SiteRole::ThenEntry));
                }
                if mentions_condition {
                    sites.push(site(
                        owner,
                        format!("{command}.Then.{}", entry.event()),
                        SiteRole::Constraint,
                    ));
                }
            }
            if let OutcomeSpec::Keyed { cases, .. } = &decision.outcome {
                for case in cases.iter().filter(|case| outcome_key_mentions(&case.key, name)) {
                    sites.push(site(
                        owner,
                        format!("{command}.Outcome.{}", case.key),
                        SiteRole::OutcomeKey,
                    ));
                }
            }
        }
    }

    for spec in set.processes() {
        let owner = spec.process.as_str();
        for (idx, reaction) in spec.reactions.iter().enumerate() {
            if let Some(and) = &reaction.and {
                if and.names().any(|n| n.as_str() == name) {
                    sites.push(site(owner, format!("reactions[{idx}].And"), SiteRole::Constraint));
                }
            }
            for dispatch in &reaction.then {
                let key = dispatch.outcome_key();
                if outcome_key_mentions(&key, name) {
                    sites.push(site(
                        owner,
                        format!("reactions[{idx}].Then.{key}"),
                        SiteRole::ThenEntry,
                    ));
                }
                let mentions_condition = dispatch
                    .conditions
                    .as_ref()
                    .is_some_and(|list| list.names().any(|n| n.as_str() == name));
                if mentions_condition {
                    sites.push(site(
                        owner,
                        format!("reactions[{idx}].Then.{key}.conditions"),
                        SiteRole::Constraint,
                    ));
                }
            }
            if let OutcomeSpec::Keyed { cases, .. } = &reaction.outcome {
                for case in cases.iter().filter(|case| outcome_key_mentions(&case.key, name)) {
                    sites.push(site(
                        owner,
                        format!("reactions[{idx}].Outcome.{}", case.key),
                        SiteRole::OutcomeKey,
                    ));
                }
            }
        }
    }

    sites
}

fn site(owner: &str, location: String, role: SiteRole) -> TraceSite {
    TraceSite {
        owner: owner.to_string(),
        location,
        role,
    }
}

/// An outcome/then key mentions a name if it equals it, or if either side
/// of its `Command -> Decider` form equals it.
fn outcome_key_mentions(key: &str, name: &str) -> bool {
    if key == name {
        return true;
    }
    match key.split_once("->") {
        Some((command, decider)) => command.trim() == name || decider.trim() == name,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::validated_set;

    const ORDER: &str = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    And:
      - cart-is-not-empty: dm.state.items > 0
    Then: OrderPlaced
    Outcome:
      OrderPlaced:
        - order-is-open
  - When: CancelOrder
    And:
      - cart-is-not-empty: dm.state.items > 0
    Then: OrderCancelled
    Outcome:
      - order-is-cancelled
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
common:
  order-is-fresh: rm.event.placedAt > rm.ctx.cutoff
reactions:
  - When: OrderPlaced
    From: Order
    And:
      - order-is-fresh
    Then: ReserveStock -> Inventory
    Outcome:
      - reservation-requested
"#;

    #[test]
    fn forward_trace_reaches_dispatched_commands() {
        let set = validated_set(&[ORDER, INVENTORY], &[FULFILLMENT]);
        let trace = forward_trace(&set, "Order", "PlaceOrder").unwrap();
        assert_eq!(trace.events, vec!["OrderPlaced"]);
        assert_eq!(trace.hops.len(), 1);
        assert_eq!(trace.hops[0].process, "Fulfillment");
        assert_eq!(trace.hops[0].dispatches, vec!["ReserveStock -> Inventory"]);
    }

    #[test]
    fn forward_trace_of_unreacted_command_has_no_hops() {
        let set = validated_set(&[ORDER, INVENTORY], &[FULFILLMENT]);
        let trace = forward_trace(&set, "Order", "CancelOrder").unwrap();
        assert_eq!(trace.events, vec!["OrderCancelled"]);
        assert!(trace.hops.is_empty());
    }

    #[test]
    fn reverse_trace_finds_every_constraint_user() {
        let set = validated_set(&[ORDER, INVENTORY], &[FULFILLMENT]);
        let sites = reverse_constraint_trace(&set, "cart-is-not-empty");
        assert_eq!(sites.len(), 2);
        assert!(sites.iter().all(|s| s.owner == "Order" && s.role == SiteRole::Constraint));

        let sites = reverse_constraint_trace(&set, "order-is-fresh");
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].owner, "Fulfillment");
    }

    #[test]
    fn event_assertions_follow_outcome_keys() {
        let set = validated_set(&[ORDER, INVENTORY], &[FULFILLMENT]);
        assert_eq!(event_assertions(&set, "OrderPlaced"), vec!["order-is-open"]);
        assert!(event_assertions(&set, "OrderCancelled").is_empty());
    }

    #[test]
    fn impact_finds_textual_references_across_documents() {
        let set = validated_set(&[ORDER, INVENTORY], &[FULFILLMENT]);

        let sites = impact(&set, "ReserveStock");
        assert!(sites
            .iter()
            .any(|s| s.owner == "Fulfillment" && s.role == SiteRole::ThenEntry));

        let sites = impact(&set, "OrderPlaced");
        assert!(sites
            .iter()
            .any(|s| s.owner == "Order" && s.role == SiteRole::ThenEntry));
        assert!(sites
            .iter()
            .any(|s| s.owner == "Order" && s.role == SiteRole::OutcomeKey));
    }
}
