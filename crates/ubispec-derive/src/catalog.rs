//! Command-catalog derivation: one flat row per command across every
//! derivable Lifecycle document.

use serde::Serialize;
use serde_json::json;

use ubispec_core::PredicateEntry;
use ubispec_schema::{Decision, LifecycleSpec, OutcomeSpec};
use ubispec_verify::ValidatedSet;

use crate::output::{markdown_table, ArtifactOutput};

/// One catalog row.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRow {
    pub decider: String,
    pub command: String,
    pub constraints: usize,
    pub unconditional_events: usize,
    pub conditional_events: usize,
    /// Whether any predicate, condition, or outcome references `dm.ctx`.
    pub has_ctx: bool,
    /// Whether any Process spec dispatches this command.
    pub reacted_to: bool,
}

/// The derived command catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandCatalog {
    pub rows: Vec<CatalogRow>,
}

impl CommandCatalog {
    pub fn output(&self) -> ArtifactOutput {
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                vec![
                    row.decider.clone(),
                    row.command.clone(),
                    row.constraints.to_string(),
                    row.unconditional_events.to_string(),
                    row.conditional_events.to_string(),
                    yes_no(row.has_ctx),
                    yes_no(row.reacted_to),
                ]
            })
            .collect();
        let mut text = String::from("## Command catalog\n\n");
        text.push_str(&markdown_table(
            &["Decider", "Command", "Constraints", "Events", "Conditional", "Ctx", "Reacted to"],
            &rows,
        ));
        let data = json!({
            "artifact": "command-catalog",
            "rows": self.rows,
        });
        ArtifactOutput { text, data }
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

/// Derive the catalog across every derivable Lifecycle document.
pub fn command_catalog(set: &ValidatedSet) -> CommandCatalog {
    let mut rows = Vec::new();
    for spec in set.lifecycles() {
        for decision in &spec.lifecycle {
            let reacted_to = set.processes().any(|process| {
                process
                    .dispatched_commands()
                    .any(|(command, _)| command == &decision.when)
            });
            rows.push(CatalogRow {
                decider: spec.decider.as_str().to_string(),
                command: decision.when.as_str().to_string(),
                constraints: decision.and.as_ref().map(|list| list.len()).unwrap_or(0),
                unconditional_events: decision.unconditional_events().count(),
                conditional_events: decision.conditional_events().count(),
                has_ctx: decision_references_ctx(spec, decision),
                reacted_to,
            });
        }
    }
    CommandCatalog { rows }
}

fn decision_references_ctx(spec: &LifecycleSpec, decision: &Decision) -> bool {
    let entry_has_ctx = |entry: &PredicateEntry| -> bool {
        let expr = match entry {
            PredicateEntry::Inline { expr, .. } => Some(expr),
            PredicateEntry::Reference(name) => spec.common.get(name),
        };
        expr.is_some_and(|expr| expr.as_str().contains("dm.ctx"))
    };

    if let Some(and) = &decision.and {
        if and.entries().iter().any(entry_has_ctx) {
            return true;
        }
    }
    for event in &decision.then {
        if let Some(conditions) = event.conditions() {
            if conditions.entries().iter().any(entry_has_ctx) {
                return true;
            }
        }
    }
    let outcome_entries: Vec<&PredicateEntry> = match &decision.outcome {
        OutcomeSpec::Flat(assertions) => assertions.iter().collect(),
        OutcomeSpec::Keyed { always, cases } => always
            .iter()
            .flat_map(|a| a.iter())
            .chain(cases.iter().flat_map(|c| c.assertions.iter()))
            .collect(),
    };
    outcome_entries.into_iter().any(entry_has_ctx)
}
