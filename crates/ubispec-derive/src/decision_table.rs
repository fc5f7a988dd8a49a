//! Decision-table derivation.
//!
//! For one Decision: columns are the constraints plus the conditional
//! events' condition sets, in declaration order. Success rows enumerate all
//! 2^k truth combinations of the k conditional Then entries with every
//! constraint true; failure rows violate one constraint at a time (plus an
//! optional all-fail row), each yielding the standardized
//! `DecisionFailed [...]` output.

use serde::Serialize;
use serde_json::json;

use ubispec_schema::{Decision, EventSpec};
use ubispec_verify::ValidatedSet;

use crate::error::DeriveError;
use crate::output::{markdown_table, ArtifactOutput};
use crate::subject_lifecycle;

/// Options for table generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Also emit the row with every constraint violated.
    pub all_fail_row: bool,
}

/// Whether a row exercises the success or the failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowKind {
    Success,
    Failure,
}

/// What a row's decision produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowOutput {
    /// The exact set of events fired, in declaration order.
    Events(Vec<String>),
    /// The standardized failure signal naming the failed constraints.
    DecisionFailed(Vec<String>),
}

impl RowOutput {
    pub fn label(&self) -> String {
        match self {
            RowOutput::Events(events) if events.is_empty() => "(no events)".to_string(),
            RowOutput::Events(events) => events.join(", "),
            RowOutput::DecisionFailed(names) => {
                format!("DecisionFailed [{}]", names.join(", "))
            }
        }
    }
}

/// One decision-table row.
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub kind: RowKind,
    /// Truth value per constraint column; all true in success rows.
    pub constraints: Vec<bool>,
    /// Truth value per conditional-event column; empty in failure rows,
    /// where conditions are not evaluated.
    pub conditions: Vec<bool>,
    pub output: RowOutput,
}

/// The derived decision table for one command.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionTable {
    pub decider: String,
    pub command: String,
    /// Constraint names, in declaration order.
    pub constraint_columns: Vec<String>,
    /// One column per conditional Then entry: its condition names joined.
    pub condition_columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl DecisionTable {
    pub fn success_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Success)
    }

    pub fn failure_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Failure)
    }

    /// Render as Markdown plus JSON.
    pub fn output(&self) -> ArtifactOutput {
        let mut headers: Vec<&str> = Vec::new();
        for name in &self.constraint_columns {
            headers.push(name);
        }
        for name in &self.condition_columns {
            headers.push(name);
        }
        headers.push("Output");

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .constraints
                    .iter()
                    .map(|flag| flag_cell(*flag).to_string())
                    .collect();
                for idx in 0..self.condition_columns.len() {
                    let cell = row.conditions.get(idx).map(|flag| flag_cell(*flag)).unwrap_or("-");
                    cells.push(cell.to_string());
                }
                cells.push(row.output.label());
                cells
            })
            .collect();

        let mut text = format!("## Decision table: {} / {}\n\n", self.decider, self.command);
        text.push_str(&markdown_table(&headers, &rows));

        let data = json!({
            "artifact": "decision-table",
            "decider": self.decider,
            "command": self.command,
            "constraint_columns": self.constraint_columns,
            "condition_columns": self.condition_columns,
            "rows": self.rows,
        });
        ArtifactOutput { text, data }
    }
}

fn flag_cell(flag: bool) -> &'static str {
    if flag {
        "T"
    } else {
        "F"
    }
}

/// Derive the decision table for one command of one decider.
pub fn decision_table(
    set: &ValidatedSet,
    decider: &str,
    command: &str,
    options: TableOptions,
) -> Result<DecisionTable, DeriveError> {
    let spec = subject_lifecycle(set, decider)?;
    let decision = spec.decision(command).ok_or_else(|| DeriveError::UnknownCommand {
        decider: decider.to_string(),
        command: command.to_string(),
    })?;
    Ok(table_for_decision(decider, decision, options))
}

pub(crate) fn table_for_decision(
    decider: &str,
    decision: &Decision,
    options: TableOptions,
) -> DecisionTable {
    let constraint_columns: Vec<String> = decision
        .constraint_names()
        .iter()
        .map(|name| name.as_str().to_string())
        .collect();

    let conditionals: Vec<&EventSpec> = decision.conditional_events().collect();
    let condition_columns: Vec<String> = conditionals
        .iter()
        .map(|entry| {
            let names: Vec<&str> = entry
                .conditions()
                .expect("conditional entry")
                .names()
                .map(|n| n.as_str())
                .collect();
            names.join(" & ")
        })
        .collect();

    let k = conditionals.len();
    let mut rows = Vec::with_capacity((1usize << k) + constraint_columns.len());

    // Success rows: all constraints hold; enumerate all 2^k condition
    // combinations, all-true first.
    for mask in (0..(1usize << k)).rev() {
        let conditions: Vec<bool> = (0..k).map(|bit| mask & (1 << bit) != 0).collect();
        // Fired events keep the full Then declaration order.
        let mut ordered = Vec::with_capacity(decision.then.len());
        let mut conditional_idx = 0;
        for entry in &decision.then {
            if entry.is_conditional() {
                if conditions[conditional_idx] {
                    ordered.push(entry.event().as_str().to_string());
                }
                conditional_idx += 1;
            } else {
                ordered.push(entry.event().as_str().to_string());
            }
        }
        rows.push(TableRow {
            kind: RowKind::Success,
            constraints: vec![true; constraint_columns.len()],
            conditions,
            output: RowOutput::Events(ordered),
        });
    }

    // Failure rows: one minimal violation per constraint.
    for (idx, name) in constraint_columns.iter().enumerate() {
        let mut constraints = vec![true; constraint_columns.len()];
        constraints[idx] = false;
        rows.push(TableRow {
            kind: RowKind::Failure,
            constraints,
            conditions: Vec::new(),
            output: RowOutput::DecisionFailed(vec![name.clone()]),
        });
    }

    if options.all_fail_row && !constraint_columns.is_empty() {
        rows.push(TableRow {
            kind: RowKind::Failure,
            constraints: vec![false; constraint_columns.len()],
            conditions: Vec::new(),
            output: RowOutput::DecisionFailed(constraint_columns.clone()),
        });
    }

    DecisionTable {
        decider: decider.to_string(),
        command: decision.when.as_str().to_string(),
        constraint_columns,
        condition_columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::validated_set;

    const REGISTRY: &str = r#"
ubispec: lifecycle/v1.0
decider: Registry
identity: registryId
model: ./m.ts
common:
  registry-is-submitted: dm.state.status == 'submitted'
  reviewer-is-authorised: dm.ctx.reviewerRoles includes 'approver'
  no-unresolved-comments: dm.state.openComments == 0
lifecycle:
  - When: ApproveRegistry
    And:
      - registry-is-submitted
      - reviewer-is-authorised
      - no-unresolved-comments
    Then:
      - RegistryApproved
      - PreviousRegistryArchived:
          - has-active-registry: dm.state.activeRegistryId != null
    Outcome:
      _always:
        - registry-is-active
      PreviousRegistryArchived:
        - previous-registry-is-archived
"#;

    #[test]
    fn approve_registry_table_matches_contract() {
        let set = validated_set(&[REGISTRY], &[]);
        let table =
            decision_table(&set, "Registry", "ApproveRegistry", TableOptions::default()).unwrap();

        // Exactly 2 success rows: has-active-registry true/false.
        assert_eq!(table.success_rows().count(), 2);
        // Exactly 3 single-constraint failure rows.
        assert_eq!(table.failure_rows().count(), 3);

        let success: Vec<&TableRow> = table.success_rows().collect();
        assert_eq!(
            success[0].output,
            RowOutput::Events(vec![
                "RegistryApproved".into(),
                "PreviousRegistryArchived".into()
            ])
        );
        assert_eq!(success[1].output, RowOutput::Events(vec!["RegistryApproved".into()]));

        for (row, name) in table.failure_rows().zip([
            "registry-is-submitted",
            "reviewer-is-authorised",
            "no-unresolved-comments",
        ]) {
            assert_eq!(row.output, RowOutput::DecisionFailed(vec![name.into()]));
            assert_eq!(row.output.label(), format!("DecisionFailed [{name}]"));
            // Minimal violation: exactly one constraint false.
            assert_eq!(row.constraints.iter().filter(|f| !**f).count(), 1);
        }
    }

    #[test]
    fn success_row_count_is_two_to_the_k() {
        let text = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    And:
      - cart-is-not-empty: dm.state.items > 0
    Then:
      - OrderPlaced
      - LoyaltyPointsAwarded:
          - customer-is-member: dm.ctx.membership != null
      - GiftIncluded:
          - order-above-gift-threshold: dm.cmd.total > 100
      - ExpressLaneAssigned:
          - express-requested: dm.cmd.express == true
    Outcome:
      - order-is-open
"#;
        let set = validated_set(&[text], &[]);
        let table = decision_table(&set, "Order", "PlaceOrder", TableOptions::default()).unwrap();
        assert_eq!(table.success_rows().count(), 8); // 2^3
        assert_eq!(table.failure_rows().count(), 1);
        assert_eq!(table.condition_columns.len(), 3);
    }

    #[test]
    fn additive_then_semantics_per_truth_assignment() {
        let text = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    Then:
      - OrderPlaced
      - OrderLogged
      - LoyaltyPointsAwarded:
          - customer-is-member: dm.ctx.membership != null
      - GiftIncluded:
          - order-above-gift-threshold: dm.cmd.total > 100
    Outcome:
      - order-is-open
"#;
        let set = validated_set(&[text], &[]);
        let table = decision_table(&set, "Order", "PlaceOrder", TableOptions::default()).unwrap();

        for row in table.success_rows() {
            let RowOutput::Events(events) = &row.output else {
                panic!("success row must list events");
            };
            // The unconditional events always fire.
            assert!(events.contains(&"OrderPlaced".to_string()));
            assert!(events.contains(&"OrderLogged".to_string()));
            // Each conditional fires exactly when its flag is true.
            assert_eq!(row.conditions[0], events.contains(&"LoyaltyPointsAwarded".to_string()));
            assert_eq!(row.conditions[1], events.contains(&"GiftIncluded".to_string()));
        }
    }

    #[test]
    fn all_fail_row_is_optional() {
        let set = validated_set(&[REGISTRY], &[]);
        let options = TableOptions { all_fail_row: true };
        let table = decision_table(&set, "Registry", "ApproveRegistry", options).unwrap();
        assert_eq!(table.failure_rows().count(), 4);
        let last = table.rows.last().unwrap();
        assert_eq!(
            last.output,
            RowOutput::DecisionFailed(vec![
                "registry-is-submitted".into(),
                "reviewer-is-authorised".into(),
                "no-unresolved-comments".into()
            ])
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        let set = validated_set(&[REGISTRY], &[]);
        let err = decision_table(&set, "Registry", "RejectRegistry", TableOptions::default())
            .unwrap_err();
        assert!(matches!(err, DeriveError::UnknownCommand { .. }));

        let err =
            decision_table(&set, "Ghost", "ApproveRegistry", TableOptions::default()).unwrap_err();
        assert!(matches!(err, DeriveError::UnknownSubject { .. }));
    }

    #[test]
    fn markdown_rendering_includes_failure_signal() {
        let set = validated_set(&[REGISTRY], &[]);
        let table =
            decision_table(&set, "Registry", "ApproveRegistry", TableOptions::default()).unwrap();
        let output = table.output();
        assert!(output.text.contains("DecisionFailed [registry-is-submitted]"));
        assert_eq!(output.data["artifact"], "decision-table");
        assert_eq!(output.data["rows"].as_array().unwrap().len(), 5);
    }
}
