//! Test-scenario matrix derivation.
//!
//! One scenario per decision-table row: setup text synthesized from the
//! constraint/condition names (kebab → sentence case), expected-outcome
//! text synthesized from the Outcome block filtered by the events that row
//! fires. Scenario ids are the first three letters of the command,
//! uppercased, plus a zero-padded sequence number unique per command.

use serde::Serialize;
use serde_json::json;

use ubispec_schema::Decision;
use ubispec_verify::ValidatedSet;

use crate::decision_table::{table_for_decision, RowKind, RowOutput, TableOptions};
use crate::error::DeriveError;
use crate::output::{sentence_case, ArtifactOutput};
use crate::subject_lifecycle;

/// One derived test scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// E.g. `APP-01`.
    pub id: String,
    pub command: String,
    pub kind: RowKind,
    /// Setup lines.
    pub given: Vec<String>,
    /// Expected-outcome lines.
    pub expect: Vec<String>,
}

/// The scenario matrix for one command.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioMatrix {
    pub decider: String,
    pub command: String,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioMatrix {
    pub fn output(&self) -> ArtifactOutput {
        let mut text = format!("## Test scenarios: {} / {}\n", self.decider, self.command);
        for scenario in &self.scenarios {
            text.push_str(&format!("\n### {}\n", scenario.id));
            for line in &scenario.given {
                text.push_str(&format!("- Given {line}\n"));
            }
            for line in &scenario.expect {
                text.push_str(&format!("- Expect {line}\n"));
            }
        }
        let data = json!({
            "artifact": "scenarios",
            "decider": self.decider,
            "command": self.command,
            "scenarios": self.scenarios,
        });
        ArtifactOutput { text, data }
    }
}

/// Derive the scenario matrix for one command of one decider.
pub fn scenarios(
    set: &ValidatedSet,
    decider: &str,
    command: &str,
    options: TableOptions,
) -> Result<ScenarioMatrix, DeriveError> {
    let spec = subject_lifecycle(set, decider)?;
    let decision = spec.decision(command).ok_or_else(|| DeriveError::UnknownCommand {
        decider: decider.to_string(),
        command: command.to_string(),
    })?;
    Ok(matrix_for_decision(decider, decision, options))
}

pub(crate) fn matrix_for_decision(
    decider: &str,
    decision: &Decision,
    options: TableOptions,
) -> ScenarioMatrix {
    let table = table_for_decision(decider, decision, options);
    let prefix = scenario_prefix(decision.when.as_str());

    let scenarios = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut given = Vec::new();
            for (constraint, holds) in table.constraint_columns.iter().zip(&row.constraints) {
                given.push(holds_line(constraint, *holds));
            }
            for (condition, holds) in table.condition_columns.iter().zip(&row.conditions) {
                given.push(holds_line(condition, *holds));
            }

            let expect = match &row.output {
                RowOutput::DecisionFailed(_) => vec![row.output.label()],
                RowOutput::Events(events) => {
                    let mut lines = vec![format!("events emitted: {}", row.output.label())];
                    for assertion in decision.outcome.universal_assertions() {
                        lines.push(sentence_case(assertion.name().as_str()));
                    }
                    for event in events {
                        if let Some(assertions) = decision.outcome.case_assertions(event) {
                            for assertion in assertions {
                                lines.push(sentence_case(assertion.name().as_str()));
                            }
                        }
                    }
                    lines
                }
            };

            Scenario {
                id: format!("{prefix}-{:02}", idx + 1),
                command: decision.when.as_str().to_string(),
                kind: row.kind,
                given,
                expect,
            }
        })
        .collect();

    ScenarioMatrix {
        decider: decider.to_string(),
        command: decision.when.as_str().to_string(),
        scenarios,
    }
}

fn scenario_prefix(command: &str) -> String {
    command.chars().take(3).collect::<String>().to_ascii_uppercase()
}

fn holds_line(name: &str, holds: bool) -> String {
    let sentence = sentence_case(name);
    if holds {
        sentence
    } else {
        format!("{sentence} does not hold")
    }
}
