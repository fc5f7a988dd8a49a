//! Validation-checklist derivation.
//!
//! One section per Decision: preconditions from `And`, success entries from
//! `Then` annotated `(always)` or `(when ...)`, after-assertions grouped by
//! `_always`/event key, and the fixed implicit-failure boilerplate shared
//! by every command.

use serde::Serialize;
use serde_json::json;

use ubispec_schema::{Decision, EventSpec, OutcomeSpec};
use ubispec_verify::ValidatedSet;

use crate::error::DeriveError;
use crate::output::{sentence_case, ArtifactOutput};
use crate::subject_lifecycle;

/// The implicit-failure convention: identical for every command.
pub const IMPLICIT_FAILURE: &str =
    "The command is rejected with the names of every failed constraint; no events are emitted and state is unchanged.";

/// One group of after-assertions.
#[derive(Debug, Clone, Serialize)]
pub struct AfterGroup {
    /// `always`, or the event key the assertions belong to.
    pub heading: String,
    pub assertions: Vec<String>,
}

/// The checklist section for one command.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistSection {
    pub command: String,
    pub actor: Option<String>,
    pub preconditions: Vec<String>,
    pub on_success: Vec<String>,
    pub after: Vec<AfterGroup>,
    pub on_failure: String,
}

/// The derived checklist for one decider.
#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub decider: String,
    pub sections: Vec<ChecklistSection>,
}

impl Checklist {
    pub fn output(&self) -> ArtifactOutput {
        let mut text = format!("# Validation checklist: {}\n", self.decider);
        for section in &self.sections {
            text.push_str(&format!("\n## {}\n", section.command));
            if let Some(actor) = &section.actor {
                text.push_str(&format!("Actor: {actor}\n"));
            }
            if !section.preconditions.is_empty() {
                text.push_str("\nPreconditions:\n");
                for line in &section.preconditions {
                    text.push_str(&format!("- [ ] {line}\n"));
                }
            }
            text.push_str("\nOn success:\n");
            for line in &section.on_success {
                text.push_str(&format!("- [ ] {line}\n"));
            }
            if !section.after.is_empty() {
                text.push_str("\nAfter:\n");
                for group in &section.after {
                    for assertion in &group.assertions {
                        text.push_str(&format!("- [ ] ({}) {assertion}\n", group.heading));
                    }
                }
            }
            text.push_str(&format!("\nOn failure: {}\n", section.on_failure));
        }
        let data = json!({
            "artifact": "checklist",
            "decider": self.decider,
            "sections": self.sections,
        });
        ArtifactOutput { text, data }
    }
}

/// Derive the checklist for every decision of one decider.
pub fn checklist(set: &ValidatedSet, decider: &str) -> Result<Checklist, DeriveError> {
    let spec = subject_lifecycle(set, decider)?;
    let sections = spec
        .lifecycle
        .iter()
        .map(section_for_decision)
        .collect();
    Ok(Checklist {
        decider: decider.to_string(),
        sections,
    })
}

fn section_for_decision(decision: &Decision) -> ChecklistSection {
    let preconditions = decision
        .constraint_names()
        .iter()
        .map(|name| sentence_case(name.as_str()))
        .collect();

    let on_success = decision
        .then
        .iter()
        .map(|entry| match entry {
            EventSpec::Unconditional(event) => format!("{event} (always)"),
            EventSpec::Conditional { event, conditions } => {
                let names: Vec<&str> = conditions.names().map(|n| n.as_str()).collect();
                format!("{event} (when {})", names.join(", "))
            }
        })
        .collect();

    let mut after = Vec::new();
    match &decision.outcome {
        OutcomeSpec::Flat(assertions) => {
            after.push(AfterGroup {
                heading: "always".to_string(),
                assertions: assertions
                    .iter()
                    .map(|a| sentence_case(a.name().as_str()))
                    .collect(),
            });
        }
        OutcomeSpec::Keyed { always, cases } => {
            if let Some(always) = always {
                after.push(AfterGroup {
                    heading: "always".to_string(),
                    assertions: always.iter().map(|a| sentence_case(a.name().as_str())).collect(),
                });
            }
            for case in cases {
                after.push(AfterGroup {
                    heading: case.key.clone(),
                    assertions: case
                        .assertions
                        .iter()
                        .map(|a| sentence_case(a.name().as_str()))
                        .collect(),
                });
            }
        }
    }

    ChecklistSection {
        command: decision.when.as_str().to_string(),
        actor: decision.actor.clone(),
        preconditions,
        on_success,
        after,
        on_failure: IMPLICIT_FAILURE.to_string(),
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
lifecycle:
  - When: ApproveRegistry
    actor: reviewer
    And:
      - registry-is-submitted: dm.state.status == 'submitted'
    Then:
      - RegistryApproved
      - PreviousRegistryArchived:
          - has-active-registry: dm.state.activeRegistryId != null
    Outcome:
      _always:
        - registry-is-active
      PreviousRegistryArchived:
        - previous-registry-is-archived
  - When: SubmitRegistry
    Then: RegistrySubmitted
    Outcome:
      - registry-is-submitted
"#;

    #[test]
    fn one_section_per_decision() {
        let set = validated_set(&[REGISTRY], &[]);
        let list = checklist(&set, "Registry").unwrap();
        assert_eq!(list.sections.len(), 2);
        assert_eq!(list.sections[0].command, "ApproveRegistry");
        assert_eq!(list.sections[1].command, "SubmitRegistry");
    }

    #[test]
    fn success_entries_are_annotated() {
        let set = validated_set(&[REGISTRY], &[]);
        let list = checklist(&set, "Registry").unwrap();
        let section = &list.sections[0];
        assert_eq!(section.on_success[0], "RegistryApproved (always)");
        assert_eq!(
            section.on_success[1],
            "PreviousRegistryArchived (when has-active-registry)"
        );
    }

    #[test]
    fn after_groups_follow_outcome_shape() {
        let set = validated_set(&[REGISTRY], &[]);
        let list = checklist(&set, "Registry").unwrap();

        let keyed = &list.sections[0];
        assert_eq!(keyed.after[0].heading, "always");
        assert_eq!(keyed.after[0].assertions, vec!["Registry is active"]);
        assert_eq!(keyed.after[1].heading, "PreviousRegistryArchived");

        let flat = &list.sections[1];
        assert_eq!(flat.after[0].heading, "always");
        assert_eq!(flat.after[0].assertions, vec!["Registry is submitted"]);
    }

    #[test]
    fn failure_boilerplate_is_identical_for_every_command() {
        let set = validated_set(&[REGISTRY], &[]);
        let list = checklist(&set, "Registry").unwrap();
        for section in &list.sections {
            assert_eq!(section.on_failure, IMPLICIT_FAILURE);
        }
    }

    #[test]
    fn rendering_contains_checkboxes() {
        let set = validated_set(&[REGISTRY], &[]);
        let output = checklist(&set, "Registry").unwrap().output();
        assert!(output.text.contains("- [ ] Registry is submitted"));
        assert!(output.text.contains("Actor: reviewer"));
        assert!(output.text.contains("On failure:"));
        assert_eq!(output.data["artifact"], "checklist");
    }
}
