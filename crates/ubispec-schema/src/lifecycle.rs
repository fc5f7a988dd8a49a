//! The Lifecycle model: one aggregate's command/event/outcome contract.
//!
//! A Lifecycle document declares a decider and one [`Decision`] per command.
//! Each Decision lists constraints (`And`), emitted events (`Then`, additive
//! semantics), and post-success assertions (`Outcome`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ubispec_core::{
    ConstraintList, FormatVersion, Issue, IssueCode, KebabIdent, PascalIdent, PredicateEntry,
    PredicateExpression, SpecKind,
};

use crate::walk::{self, parse_constraint_list, req_seq, req_str, Collector};
use crate::Parsed;

/// One `Then` entry: an event that fires on success, unconditionally or
/// gated by conditions (additive, never first-match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSpec {
    Unconditional(PascalIdent),
    Conditional {
        event: PascalIdent,
        conditions: ConstraintList,
    },
}

impl EventSpec {
    pub fn event(&self) -> &PascalIdent {
        match self {
            EventSpec::Unconditional(event) => event,
            EventSpec::Conditional { event, .. } => event,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, EventSpec::Conditional { .. })
    }

    pub fn conditions(&self) -> Option<&ConstraintList> {
        match self {
            EventSpec::Unconditional(_) => None,
            EventSpec::Conditional { conditions, .. } => Some(conditions),
        }
    }

    /// The exact textual form a keyed `Outcome` section must use.
    pub fn outcome_key(&self) -> String {
        self.event().as_str().to_string()
    }
}

/// One keyed `Outcome` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCase {
    /// The exact textual form of the matching `Then` entry.
    pub key: String,
    pub assertions: Vec<PredicateEntry>,
}

/// Post-success assertions: flat (apply to every success) or keyed by the
/// `Then` entry they belong to, with `_always` for universal assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeSpec {
    Flat(Vec<PredicateEntry>),
    Keyed {
        always: Option<Vec<PredicateEntry>>,
        cases: Vec<OutcomeCase>,
    },
}

impl OutcomeSpec {
    /// Assertions that apply regardless of which events fired.
    pub fn universal_assertions(&self) -> &[PredicateEntry] {
        match self {
            OutcomeSpec::Flat(assertions) => assertions,
            OutcomeSpec::Keyed { always, .. } => always.as_deref().unwrap_or(&[]),
        }
    }

    /// Assertions keyed to one specific `Then` entry.
    pub fn case_assertions(&self, key: &str) -> Option<&[PredicateEntry]> {
        match self {
            OutcomeSpec::Flat(_) => None,
            OutcomeSpec::Keyed { cases, .. } => cases
                .iter()
                .find(|case| case.key == key)
                .map(|case| case.assertions.as_slice()),
        }
    }
}

/// One command's complete behavioral entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub when: PascalIdent,
    pub actor: Option<String>,
    pub and: Option<ConstraintList>,
    pub then: Vec<EventSpec>,
    pub outcome: OutcomeSpec,
}

impl Decision {
    /// Constraint names, in declaration order.
    pub fn constraint_names(&self) -> Vec<&KebabIdent> {
        self.and.as_ref().map(|list| list.names().collect()).unwrap_or_default()
    }

    /// Conditional `Then` entries, in declaration order.
    pub fn conditional_events(&self) -> impl Iterator<Item = &EventSpec> {
        self.then.iter().filter(|entry| entry.is_conditional())
    }

    /// Unconditional event names, in declaration order.
    pub fn unconditional_events(&self) -> impl Iterator<Item = &PascalIdent> {
        self.then.iter().filter_map(|entry| match entry {
            EventSpec::Unconditional(event) => Some(event),
            EventSpec::Conditional { .. } => None,
        })
    }
}

/// A validated Lifecycle document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSpec {
    pub version: FormatVersion,
    pub decider: PascalIdent,
    /// Field of the aggregate's identity, free-form.
    pub identity: String,
    /// Path to the model-types collaborator for this decider.
    pub model: String,
    pub common: BTreeMap<KebabIdent, PredicateExpression>,
    pub lifecycle: Vec<Decision>,
}

impl LifecycleSpec {
    /// Every event name this decider can emit, deduplicated.
    pub fn declared_events(&self) -> BTreeSet<&PascalIdent> {
        self.lifecycle
            .iter()
            .flat_map(|d| d.then.iter().map(|e| e.event()))
            .collect()
    }

    /// Every command name this decider accepts.
    pub fn declared_commands(&self) -> BTreeSet<&PascalIdent> {
        self.lifecycle.iter().map(|d| &d.when).collect()
    }

    pub fn decision(&self, command: &str) -> Option<&Decision> {
        self.lifecycle.iter().find(|d| d.when.as_str() == command)
    }
}

/// Parse and validate one Lifecycle document.
///
/// All structural and reference issues are collected, not fail-fast; a
/// successful parse still carries advisory issues.
pub fn parse_lifecycle(root: &Value) -> Result<Parsed<LifecycleSpec>, Vec<Issue>> {
    let mut c = Collector::new();
    let Some(map) = walk::as_object(root, &mut c) else {
        return Err(c.into_issues());
    };

    // Header fields.
    let version = parse_header(map, SpecKind::Lifecycle, &mut c);
    let decider = walk::req_pascal(map, "decider", &mut c);
    let identity = req_str(map, "identity", &mut c).map(str::to_string);
    let model = req_str(map, "model", &mut c).map(str::to_string);

    // The shared predicate map.
    let common = parse_common(map, &mut c);

    // Decisions.
    let mut decisions = Vec::new();
    let mut seen_commands: BTreeSet<String> = BTreeSet::new();
    if let Some(seq) = req_seq(map, "lifecycle", &mut c) {
        c.push_field("lifecycle");
        for (idx, value) in seq.iter().enumerate() {
            c.push_index(idx);
            if let Some(decision) = parse_decision(value, &common, &mut c) {
                if !seen_commands.insert(decision.when.as_str().to_string()) {
                    c.report_at(
                        "When",
                        IssueCode::DuplicateCommand,
                        format!("command '{}' already has a decision in this document", decision.when),
                    );
                } else {
                    decisions.push(decision);
                }
            }
            c.pop();
        }
        c.pop();
    }

    if c.has_errors() {
        return Err(c.into_issues());
    }

    let spec = LifecycleSpec {
        version: version.expect("no errors collected"),
        decider: decider.expect("no errors collected"),
        identity: identity.expect("no errors collected"),
        model: model.expect("no errors collected"),
        common,
        lifecycle: decisions,
    };
    Ok(Parsed {
        spec,
        advisories: c.into_issues(),
    })
}

/// Parse the `ubispec` header literal and check kind + version support.
pub(crate) fn parse_header(
    map: &serde_json::Map<String, Value>,
    expected: SpecKind,
    c: &mut Collector,
) -> Option<FormatVersion> {
    let literal = req_str(map, "ubispec", c)?;
    let version = match FormatVersion::parse(literal) {
        Ok(version) => version,
        Err(err) => {
            c.report_at("ubispec", IssueCode::TypeMismatch, err.to_string());
            return None;
        }
    };
    if version.kind != expected {
        c.report_at(
            "ubispec",
            IssueCode::WrongKind,
            format!("expected a {expected} document, found '{version}'"),
        );
        return None;
    }
    if !version.is_supported() {
        c.report_at(
            "ubispec",
            IssueCode::UnsupportedVersion,
            format!(
                "version '{version}' is newer than the supported {}",
                FormatVersion::current(expected)
            ),
        );
        return None;
    }
    Some(version)
}

/// Parse the optional `common` predicate map.
pub(crate) fn parse_common(
    map: &serde_json::Map<String, Value>,
    c: &mut Collector,
) -> BTreeMap<KebabIdent, PredicateExpression> {
    let mut common = BTreeMap::new();
    let Some(value) = map.get("common") else {
        return common;
    };
    c.push_field("common");
    match value.as_object() {
        None => c.report(IssueCode::TypeMismatch, "'common' must be a mapping"),
        Some(entries) => {
            for (key, expr_value) in entries {
                let name = match KebabIdent::parse(key) {
                    Ok(name) => name,
                    Err(err) => {
                        c.report(IssueCode::InvalidIdentifier, err.to_string());
                        continue;
                    }
                };
                let Some(text) = expr_value.as_str() else {
                    c.report_at(key, IssueCode::TypeMismatch, "common entry must be a string");
                    continue;
                };
                match PredicateExpression::new(text) {
                    Some(expr) => {
                        common.insert(name, expr);
                    }
                    None => {
                        c.report_at(key, IssueCode::TypeMismatch, "common entry must not be empty");
                    }
                }
            }
        }
    }
    c.pop();
    common
}

/// Check that every bare reference in a constraint list resolves in `common`.
pub(crate) fn check_common_references(
    list: &ConstraintList,
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) {
    for entry in list.entries() {
        if let PredicateEntry::Reference(name) = entry {
            if !common.contains_key(name) {
                c.report(
                    IssueCode::UnresolvedCommonReference,
                    format!("'{name}' is not defined in this document's common map"),
                );
            }
        }
    }
}

fn parse_decision(
    value: &Value,
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<Decision> {
    let map = walk::as_object(value, c)?;

    let when = walk::req_pascal(map, "When", c);
    let actor = walk::opt_str(map, "actor", c).map(str::to_string);

    let and = match map.get("And") {
        None => None,
        Some(value) => {
            c.push_field("And");
            let list = parse_constraint_list(value, c);
            if let Some(ref list) = list {
                check_common_references(list, common, c);
            }
            c.pop();
            list
        }
    };

    let then = parse_then(map, common, c);

    let outcome = match map.get("Outcome") {
        None => {
            c.report_at("Outcome", IssueCode::MissingField, "required field 'Outcome' is missing");
            None
        }
        Some(value) => {
            c.push_field("Outcome");
            let keys: Vec<String> = then
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .map(|e| e.outcome_key())
                .collect();
            let outcome = parse_outcome(value, &keys, c);
            c.pop();
            outcome
        }
    };

    let (then, outcome) = (then?, outcome?);

    // All-conditional Then blocks cannot statically guarantee an emission.
    if then.iter().all(|entry| entry.is_conditional()) {
        c.report_at(
            "Then",
            IssueCode::PotentialEmptyEmission,
            "every Then entry is conditional; success may emit no event",
        );
    }

    // Conditional events should have some outcome coverage.
    if let OutcomeSpec::Keyed { cases, .. } = &outcome {
        for entry in then.iter().filter(|e| e.is_conditional()) {
            let key = entry.outcome_key();
            if !cases.iter().any(|case| case.key == key) {
                c.report_at(
                    "Outcome",
                    IssueCode::MissingOutcomeCoverage,
                    format!("conditional event '{key}' has no outcome coverage"),
                );
            }
        }
    }

    Some(Decision {
        when: when?,
        actor,
        and,
        then,
        outcome,
    })
}

fn parse_then(
    map: &serde_json::Map<String, Value>,
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<Vec<EventSpec>> {
    let Some(value) = map.get("Then") else {
        c.report_at("Then", IssueCode::MissingField, "required field 'Then' is missing");
        return None;
    };
    c.push_field("Then");
    let result = match value {
        Value::String(text) => match PascalIdent::parse(text) {
            Ok(event) => Some(vec![EventSpec::Unconditional(event)]),
            Err(err) => {
                c.report(IssueCode::PatternMismatch, err.to_string());
                None
            }
        },
        Value::Array(seq) if !seq.is_empty() => {
            let mut entries = Vec::with_capacity(seq.len());
            let mut complete = true;
            for (idx, entry_value) in seq.iter().enumerate() {
                c.push_index(idx);
                match parse_then_entry(entry_value, common, c) {
                    Some(entry) => entries.push(entry),
                    None => complete = false,
                }
                c.pop();
            }
            complete.then_some(entries)
        }
        Value::Array(_) => {
            c.report(IssueCode::TypeMismatch, "'Then' must not be empty");
            None
        }
        _ => {
            c.report(IssueCode::TypeMismatch, "'Then' must be an event name or a sequence");
            None
        }
    };
    c.pop();
    result
}

fn parse_then_entry(
    value: &Value,
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<EventSpec> {
    match value {
        Value::String(text) => {
            let event = match PascalIdent::parse(text) {
                Ok(event) => event,
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    return None;
                }
            };
            Some(EventSpec::Unconditional(event))
        }
        Value::Object(map) => {
            if map.len() != 1 {
                c.report(
                    IssueCode::TypeMismatch,
                    format!("conditional Then entry must have exactly one event key, found {}", map.len()),
                );
                return None;
            }
            let (key, conditions_value) = map.iter().next().expect("len checked above");
            let event = match PascalIdent::parse(key) {
                Ok(event) => event,
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    return None;
                }
            };
            c.push_field(key);
            let conditions = parse_constraint_list(conditions_value, c);
            if let Some(ref list) = conditions {
                check_common_references(list, common, c);
            }
            c.pop();
            Some(EventSpec::Conditional {
                event,
                conditions: conditions?,
            })
        }
        _ => {
            c.report(IssueCode::TypeMismatch, "expected an event name or 'EventName: conditions'");
            None
        }
    }
}

/// Parse an `Outcome` block given the exact textual keys its `Then` declares.
pub(crate) fn parse_outcome(
    value: &Value,
    then_keys: &[String],
    c: &mut Collector,
) -> Option<OutcomeSpec> {
    match value {
        Value::Array(_) => {
            let assertions = parse_assertions(value, c)?;
            Some(OutcomeSpec::Flat(assertions))
        }
        Value::Object(map) => {
            let mut always = None;
            let mut cases = Vec::new();
            let mut complete = true;
            for (key, assertions_value) in map {
                c.push_field(key);
                let assertions = parse_assertions(assertions_value, c);
                if key == "_always" {
                    match assertions {
                        Some(assertions) => always = Some(assertions),
                        None => complete = false,
                    }
                } else {
                    if !then_keys.iter().any(|k| k == key) {
                        c.report(
                            IssueCode::OutcomeKeyMismatch,
                            format!("outcome key '{key}' does not match any Then entry"),
                        );
                        complete = false;
                    }
                    match assertions {
                        Some(assertions) => cases.push(OutcomeCase {
                            key: key.clone(),
                            assertions,
                        }),
                        None => complete = false,
                    }
                }
                c.pop();
            }
            complete.then_some(OutcomeSpec::Keyed { always, cases })
        }
        _ => {
            c.report(IssueCode::TypeMismatch, "'Outcome' must be a sequence or a keyed mapping");
            None
        }
    }
}

fn parse_assertions(value: &Value, c: &mut Collector) -> Option<Vec<PredicateEntry>> {
    let Some(seq) = value.as_array() else {
        c.report(IssueCode::TypeMismatch, "expected a sequence of assertions");
        return None;
    };
    if seq.is_empty() {
        c.report(IssueCode::TypeMismatch, "assertion list must not be empty");
        return None;
    }
    let mut assertions = Vec::with_capacity(seq.len());
    let mut complete = true;
    for (idx, entry_value) in seq.iter().enumerate() {
        c.push_index(idx);
        match walk::parse_predicate_entry(entry_value, c) {
            Some(entry) => assertions.push(entry),
            None => complete = false,
        }
        c.pop();
    }
    complete.then_some(assertions)
}
