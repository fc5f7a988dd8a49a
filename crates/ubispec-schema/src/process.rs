//! The Process model: cross-aggregate event reactions and command dispatch.
//!
//! A Process document names the deciders it reacts to and emits to, then
//! lists [`Reaction`]s: a trigger (scalar event, any-of fan-in, or all-of
//! correlation join), optional constraints, and the commands dispatched to
//! target deciders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ubispec_core::{
    ConstraintList, FormatVersion, Issue, IssueCode, KebabIdent, PascalIdent, PredicateExpression,
    SpecKind,
};

use crate::lifecycle::{check_common_references, parse_common, parse_header, parse_outcome, OutcomeSpec};
use crate::walk::{self, parse_constraint_list, req_seq, req_str, Collector};
use crate::Parsed;

/// How a reaction is initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Fired by the runtime as soon as the trigger matches.
    #[default]
    Automated,
    /// A human decision point; requires an `actor`.
    Policy,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::Automated => "automated",
            TriggerMode::Policy => "policy",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "automated" => Some(TriggerMode::Automated),
            "policy" => Some(TriggerMode::Policy),
            _ => None,
        }
    }
}

/// One event of an All trigger, with its source decider resolved.
///
/// `explicit_source` records whether the author wrote the
/// `"Event from Decider"` form (as opposed to a bare name resolved through
/// the reaction's shared `From`), so re-serialization preserves the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllEntry {
    pub event: PascalIdent,
    pub source: PascalIdent,
    pub explicit_source: bool,
}

/// The trigger of a reaction.
///
/// Any triggers produce a single discriminated value downstream consumers
/// narrow by a discriminant field; All triggers address each event payload
/// individually by name and join on the `correlate` field. That distinction
/// is documented behavior, not extra schema structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    Scalar {
        event: PascalIdent,
        source: PascalIdent,
    },
    Any {
        events: Vec<PascalIdent>,
        source: PascalIdent,
    },
    All {
        entries: Vec<AllEntry>,
        correlate: String,
    },
}

impl Trigger {
    /// Every (event, source decider) pair this trigger listens on.
    pub fn event_sources(&self) -> Vec<(&PascalIdent, &PascalIdent)> {
        match self {
            Trigger::Scalar { event, source } => vec![(event, source)],
            Trigger::Any { events, source } => events.iter().map(|e| (e, source)).collect(),
            Trigger::All { entries, .. } => {
                entries.iter().map(|e| (&e.event, &e.source)).collect()
            }
        }
    }

    /// The correlate field, for All triggers.
    pub fn correlate(&self) -> Option<&str> {
        match self {
            Trigger::All { correlate, .. } => Some(correlate),
            _ => None,
        }
    }

    /// Short label for displays, e.g. `all(InventoryReserved, PaymentCaptured)`.
    pub fn label(&self) -> String {
        match self {
            Trigger::Scalar { event, .. } => event.to_string(),
            Trigger::Any { events, .. } => {
                let names: Vec<&str> = events.iter().map(|e| e.as_str()).collect();
                format!("any({})", names.join(", "))
            }
            Trigger::All { entries, .. } => {
                let names: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
                format!("all({})", names.join(", "))
            }
        }
    }
}

/// One `Then` entry of a reaction: a command dispatched to a target decider,
/// unconditional or gated by conditions (additive semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSpec {
    pub command: PascalIdent,
    pub target: PascalIdent,
    pub conditions: Option<ConstraintList>,
}

impl DispatchSpec {
    pub fn is_conditional(&self) -> bool {
        self.conditions.is_some()
    }

    /// The exact textual form used by `Then` entries and `Outcome` keys.
    pub fn outcome_key(&self) -> String {
        format!("{} -> {}", self.command, self.target)
    }
}

/// One event-triggered coordination entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub when: Trigger,
    pub mode: TriggerMode,
    pub actor: Option<String>,
    pub and: Option<ConstraintList>,
    pub then: Vec<DispatchSpec>,
    pub outcome: OutcomeSpec,
}

impl Reaction {
    pub fn conditional_dispatches(&self) -> impl Iterator<Item = &DispatchSpec> {
        self.then.iter().filter(|d| d.is_conditional())
    }
}

/// A validated Process document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub version: FormatVersion,
    pub process: PascalIdent,
    pub reacts_to: Vec<PascalIdent>,
    pub emits_to: Vec<PascalIdent>,
    /// Path to the model-types collaborator for this process.
    pub model: String,
    /// Stateful-saga field declarations; absent for stateless reactors.
    pub state: Option<BTreeMap<String, String>>,
    pub common: BTreeMap<KebabIdent, PredicateExpression>,
    pub reactions: Vec<Reaction>,
}

impl ProcessSpec {
    /// Whether this process manager keeps saga state.
    pub fn is_stateful(&self) -> bool {
        self.state.is_some()
    }

    /// Every command this process can dispatch, as `(command, target)` pairs.
    pub fn dispatched_commands(&self) -> impl Iterator<Item = (&PascalIdent, &PascalIdent)> {
        self.reactions
            .iter()
            .flat_map(|r| r.then.iter().map(|d| (&d.command, &d.target)))
    }
}

/// Parse and validate one Process document, collecting every issue.
pub fn parse_process(root: &Value) -> Result<Parsed<ProcessSpec>, Vec<Issue>> {
    let mut c = Collector::new();
    let Some(map) = walk::as_object(root, &mut c) else {
        return Err(c.into_issues());
    };

    let version = parse_header(map, SpecKind::Process, &mut c);
    let process = walk::req_pascal(map, "process", &mut c);
    let reacts_to = parse_decider_list(map, "reacts_to", &mut c);
    let emits_to = parse_decider_list(map, "emits_to", &mut c);
    let model = req_str(map, "model", &mut c).map(str::to_string);
    let state = parse_state(map, &mut c);
    let common = parse_common(map, &mut c);

    let mut reactions = Vec::new();
    if let Some(seq) = req_seq(map, "reactions", &mut c) {
        c.push_field("reactions");
        for (idx, value) in seq.iter().enumerate() {
            c.push_index(idx);
            if let Some(reaction) = parse_reaction(
                value,
                reacts_to.as_deref().unwrap_or(&[]),
                emits_to.as_deref().unwrap_or(&[]),
                &common,
                &mut c,
            ) {
                reactions.push(reaction);
            }
            c.pop();
        }
        c.pop();
    }

    if c.has_errors() {
        return Err(c.into_issues());
    }

    let spec = ProcessSpec {
        version: version.expect("no errors collected"),
        process: process.expect("no errors collected"),
        reacts_to: reacts_to.expect("no errors collected"),
        emits_to: emits_to.expect("no errors collected"),
        model: model.expect("no errors collected"),
        state,
        common,
        reactions,
    };
    Ok(Parsed {
        spec,
        advisories: c.into_issues(),
    })
}

fn parse_decider_list(
    map: &serde_json::Map<String, Value>,
    key: &str,
    c: &mut Collector,
) -> Option<Vec<PascalIdent>> {
    let seq = req_seq(map, key, c)?;
    c.push_field(key);
    let mut deciders = Vec::with_capacity(seq.len());
    let mut complete = true;
    for (idx, value) in seq.iter().enumerate() {
        c.push_index(idx);
        match value.as_str() {
            None => {
                c.report(IssueCode::TypeMismatch, "decider name must be a string");
                complete = false;
            }
            Some(text) => match PascalIdent::parse(text) {
                Ok(id) => deciders.push(id),
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    complete = false;
                }
            },
        }
        c.pop();
    }
    c.pop();
    complete.then_some(deciders)
}

fn parse_state(
    map: &serde_json::Map<String, Value>,
    c: &mut Collector,
) -> Option<BTreeMap<String, String>> {
    let value = map.get("state")?;
    c.push_field("state");
    let result = match value.as_object() {
        None => {
            c.report(IssueCode::TypeMismatch, "'state' must be a mapping of field to type");
            None
        }
        Some(fields) => {
            let mut state = BTreeMap::new();
            for (field, type_value) in fields {
                match type_value.as_str() {
                    Some(type_expr) => {
                        state.insert(field.clone(), type_expr.to_string());
                    }
                    None => {
                        c.report_at(field, IssueCode::TypeMismatch, "state type must be a string");
                    }
                }
            }
            Some(state)
        }
    };
    c.pop();
    result
}

fn parse_reaction(
    value: &Value,
    reacts_to: &[PascalIdent],
    emits_to: &[PascalIdent],
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<Reaction> {
    let map = walk::as_object(value, c)?;

    let from = match walk::opt_str(map, "From", c) {
        Some(text) => walk::parse_pascal(text, "From", c),
        None => None,
    };
    let correlate = walk::opt_str(map, "correlate", c).map(str::to_string);
    let when = parse_trigger(map, from.as_ref(), correlate, reacts_to, c);

    let mode = match walk::opt_str(map, "trigger", c) {
        None => TriggerMode::Automated,
        Some(text) => match TriggerMode::parse(text) {
            Some(mode) => mode,
            None => {
                c.report_at(
                    "trigger",
                    IssueCode::TypeMismatch,
                    format!("unknown trigger mode '{text}': expected automated or policy"),
                );
                TriggerMode::Automated
            }
        },
    };
    let actor = walk::opt_str(map, "actor", c).map(str::to_string);
    if mode == TriggerMode::Policy && actor.as_deref().map_or(true, str::is_empty) {
        c.report_at("actor", IssueCode::MissingActor, "policy reactions require an actor");
    }

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

    let then = parse_dispatches(map, emits_to, common, c);

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
                .map(|d| d.outcome_key())
                .collect();
            let outcome = parse_outcome(value, &keys, c);
            c.pop();
            outcome
        }
    };

    Some(Reaction {
        when: when?,
        mode,
        actor,
        and,
        then: then?,
        outcome: outcome?,
    })
}

fn parse_trigger(
    map: &serde_json::Map<String, Value>,
    from: Option<&PascalIdent>,
    correlate: Option<String>,
    reacts_to: &[PascalIdent],
    c: &mut Collector,
) -> Option<Trigger> {
    let Some(value) = map.get("When") else {
        c.report_at("When", IssueCode::MissingField, "required field 'When' is missing");
        return None;
    };
    c.push_field("When");
    let trigger = match value {
        Value::String(text) => parse_scalar_trigger(text, from, reacts_to, c),
        Value::Object(shape) if shape.len() == 1 => {
            let (key, list_value) = shape.iter().next().expect("len checked above");
            match key.as_str() {
                "any" => parse_any_trigger(list_value, from, reacts_to, c),
                "all" => parse_all_trigger(list_value, from, correlate, reacts_to, c),
                other => {
                    c.report(
                        IssueCode::TypeMismatch,
                        format!("unknown trigger form '{other}': expected any or all"),
                    );
                    None
                }
            }
        }
        _ => {
            c.report(
                IssueCode::TypeMismatch,
                "'When' must be an event name, {any: [...]}, or {all: [...]}",
            );
            None
        }
    };
    c.pop();
    trigger
}

fn check_source(source: &PascalIdent, reacts_to: &[PascalIdent], c: &mut Collector) {
    if !reacts_to.contains(source) {
        c.report(
            IssueCode::UndeclaredSource,
            format!("source decider '{source}' is not listed in reacts_to"),
        );
    }
}

fn parse_scalar_trigger(
    text: &str,
    from: Option<&PascalIdent>,
    reacts_to: &[PascalIdent],
    c: &mut Collector,
) -> Option<Trigger> {
    let event = match PascalIdent::parse(text) {
        Ok(event) => event,
        Err(err) => {
            c.report(IssueCode::PatternMismatch, err.to_string());
            return None;
        }
    };
    let Some(source) = from else {
        c.report(IssueCode::MissingField, "scalar triggers require 'From'");
        return None;
    };
    check_source(source, reacts_to, c);
    Some(Trigger::Scalar {
        event,
        source: source.clone(),
    })
}

fn parse_any_trigger(
    value: &Value,
    from: Option<&PascalIdent>,
    reacts_to: &[PascalIdent],
    c: &mut Collector,
) -> Option<Trigger> {
    c.push_field("any");
    let events = parse_event_names(value, c);
    let result = match events {
        None => None,
        Some(events) => {
            let mut ok = true;
            if events.len() < 2 {
                c.report(IssueCode::TypeMismatch, "any triggers require at least two event names");
                ok = false;
            }
            let mut seen = std::collections::BTreeSet::new();
            for event in &events {
                if !seen.insert(event.as_str()) {
                    c.report(
                        IssueCode::TypeMismatch,
                        format!("duplicate event '{event}' in any trigger"),
                    );
                    ok = false;
                }
            }
            let source = match from {
                Some(source) => {
                    check_source(source, reacts_to, c);
                    Some(source.clone())
                }
                None => {
                    c.report(IssueCode::MissingField, "any triggers require a shared 'From'");
                    None
                }
            };
            match (ok, source) {
                (true, Some(source)) => Some(Trigger::Any { events, source }),
                _ => None,
            }
        }
    };
    c.pop();
    result
}

fn parse_all_trigger(
    value: &Value,
    from: Option<&PascalIdent>,
    correlate: Option<String>,
    reacts_to: &[PascalIdent],
    c: &mut Collector,
) -> Option<Trigger> {
    c.push_field("all");
    let Some(seq) = value.as_array() else {
        c.report(IssueCode::TypeMismatch, "'all' must be a sequence");
        c.pop();
        return None;
    };
    let mut entries = Vec::with_capacity(seq.len());
    let mut complete = true;
    for (idx, entry_value) in seq.iter().enumerate() {
        c.push_index(idx);
        match parse_all_entry(entry_value, from, reacts_to, c) {
            Some(entry) => entries.push(entry),
            None => complete = false,
        }
        c.pop();
    }
    if entries.len() < 2 && complete {
        c.report(IssueCode::TypeMismatch, "all triggers require at least two events");
        complete = false;
    }
    c.pop();

    // Joining multiple events to one logical instance needs the correlate key.
    let correlate = match correlate {
        Some(correlate) if !correlate.is_empty() => Some(correlate),
        _ => {
            c.report_at(
                "correlate",
                IssueCode::MissingCorrelate,
                "all triggers require a 'correlate' field name",
            );
            None
        }
    };

    match (complete, correlate) {
        (true, Some(correlate)) => Some(Trigger::All { entries, correlate }),
        _ => None,
    }
}

fn parse_all_entry(
    value: &Value,
    from: Option<&PascalIdent>,
    reacts_to: &[PascalIdent],
    c: &mut Collector,
) -> Option<AllEntry> {
    let Some(text) = value.as_str() else {
        c.report(IssueCode::TypeMismatch, "all entry must be 'Event' or 'Event from Decider'");
        return None;
    };
    if let Some((event_text, source_text)) = text.split_once(" from ") {
        let event = walk::parse_pascal(event_text.trim(), "event", c);
        let source = walk::parse_pascal(source_text.trim(), "from", c);
        let (event, source) = (event?, source?);
        check_source(&source, reacts_to, c);
        Some(AllEntry {
            event,
            source,
            explicit_source: true,
        })
    } else {
        let event = walk::parse_pascal(text, "event", c)?;
        let Some(source) = from else {
            c.report(
                IssueCode::MissingField,
                "bare all-trigger events require the reaction's shared 'From'",
            );
            return None;
        };
        check_source(source, reacts_to, c);
        Some(AllEntry {
            event,
            source: source.clone(),
            explicit_source: false,
        })
    }
}

fn parse_event_names(value: &Value, c: &mut Collector) -> Option<Vec<PascalIdent>> {
    let Some(seq) = value.as_array() else {
        c.report(IssueCode::TypeMismatch, "expected a sequence of event names");
        return None;
    };
    let mut events = Vec::with_capacity(seq.len());
    let mut complete = true;
    for (idx, entry) in seq.iter().enumerate() {
        c.push_index(idx);
        match entry.as_str() {
            None => {
                c.report(IssueCode::TypeMismatch, "event name must be a string");
                complete = false;
            }
            Some(text) => match PascalIdent::parse(text) {
                Ok(event) => events.push(event),
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    complete = false;
                }
            },
        }
        c.pop();
    }
    complete.then_some(events)
}

fn parse_dispatches(
    map: &serde_json::Map<String, Value>,
    emits_to: &[PascalIdent],
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<Vec<DispatchSpec>> {
    let Some(value) = map.get("Then") else {
        c.report_at("Then", IssueCode::MissingField, "required field 'Then' is missing");
        return None;
    };
    c.push_field("Then");
    let result = match value {
        Value::String(text) => {
            parse_dispatch_target(text, c).map(|(command, target)| {
                check_target(&target, emits_to, c);
                vec![DispatchSpec {
                    command,
                    target,
                    conditions: None,
                }]
            })
        }
        Value::Array(seq) if !seq.is_empty() => {
            let mut dispatches = Vec::with_capacity(seq.len());
            let mut complete = true;
            for (idx, entry_value) in seq.iter().enumerate() {
                c.push_index(idx);
                match parse_dispatch_entry(entry_value, emits_to, common, c) {
                    Some(dispatch) => dispatches.push(dispatch),
                    None => complete = false,
                }
                c.pop();
            }
            complete.then_some(dispatches)
        }
        Value::Array(_) => {
            c.report(IssueCode::TypeMismatch, "'Then' must not be empty");
            None
        }
        _ => {
            c.report(IssueCode::TypeMismatch, "'Then' must be a dispatch or a sequence");
            None
        }
    };
    c.pop();
    result
}

fn check_target(target: &PascalIdent, emits_to: &[PascalIdent], c: &mut Collector) {
    if !emits_to.contains(target) {
        c.report(
            IssueCode::UndeclaredTarget,
            format!("target decider '{target}' is not listed in emits_to"),
        );
    }
}

fn parse_dispatch_entry(
    value: &Value,
    emits_to: &[PascalIdent],
    common: &BTreeMap<KebabIdent, PredicateExpression>,
    c: &mut Collector,
) -> Option<DispatchSpec> {
    match value {
        Value::String(text) => {
            let (command, target) = parse_dispatch_target(text, c)?;
            check_target(&target, emits_to, c);
            Some(DispatchSpec {
                command,
                target,
                conditions: None,
            })
        }
        Value::Object(map) => {
            if map.len() != 1 {
                c.report(
                    IssueCode::TypeMismatch,
                    format!("conditional Then entry must have exactly one dispatch key, found {}", map.len()),
                );
                return None;
            }
            let (key, conditions_value) = map.iter().next().expect("len checked above");
            let parsed_target = parse_dispatch_target(key, c);
            c.push_field(key);
            let conditions = parse_constraint_list(conditions_value, c);
            if let Some(ref list) = conditions {
                check_common_references(list, common, c);
            }
            c.pop();
            let (command, target) = parsed_target?;
            check_target(&target, emits_to, c);
            Some(DispatchSpec {
                command,
                target,
                conditions: Some(conditions?),
            })
        }
        _ => {
            c.report(IssueCode::TypeMismatch, "expected 'Command -> Decider' or a conditional mapping");
            None
        }
    }
}

/// Parse the `"Command -> Decider"` textual form.
fn parse_dispatch_target(text: &str, c: &mut Collector) -> Option<(PascalIdent, PascalIdent)> {
    let Some((command_text, target_text)) = text.split_once("->") else {
        c.report(
            IssueCode::TypeMismatch,
            format!("'{text}' is not of the form 'Command -> Decider'"),
        );
        return None;
    };
    let command = walk::parse_pascal(command_text.trim(), "command", c);
    let target = walk::parse_pascal(target_text.trim(), "target", c);
    Some((command?, target?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ubispec_core::Document;

    const FULFILLMENT: &str = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order, Inventory, Payment]
emits_to: [Inventory, Payment, Shipping]
model: ./fulfillment-model.ts
state:
  orderId: string
  reserved: boolean
common:
  order-is-open: rm.state.status == 'open'
reactions:
  - When: OrderPlaced
    From: Order
    Then: ReserveStock -> Inventory
    Outcome:
      - reservation-requested
  - When:
      all:
        - InventoryReserved from Inventory
        - PaymentCaptured from Payment
    correlate: orderId
    Then:
      - ShipOrder -> Shipping
      - NotifyBackorder -> Inventory:
          - stock-below-threshold: rm.ctx.stockLevel < 10
    Outcome:
      _always:
        - shipment-requested
      NotifyBackorder -> Inventory:
        - backorder-flagged
  - When:
      any: [PaymentFailed, PaymentExpired]
    From: Payment
    trigger: policy
    actor: support-agent
    And:
      - order-is-open
    Then: CancelOrder -> Inventory
    Outcome:
      - cancellation-dispatched
"#;

    fn parse(text: &str) -> Result<Parsed<ProcessSpec>, Vec<Issue>> {
        let doc = Document::from_yaml_str("test", text).unwrap();
        parse_process(&doc.root)
    }

    #[test]
    fn parse_full_document() {
        let parsed = parse(FULFILLMENT).unwrap();
        let spec = &parsed.spec;
        assert_eq!(spec.process.as_str(), "Fulfillment");
        assert!(spec.is_stateful());
        assert_eq!(spec.reactions.len(), 3);

        let scalar = &spec.reactions[0];
        assert!(matches!(&scalar.when, Trigger::Scalar { event, source }
            if event.as_str() == "OrderPlaced" && source.as_str() == "Order"));

        let all = &spec.reactions[1];
        assert_eq!(all.when.correlate(), Some("orderId"));
        assert_eq!(all.when.event_sources().len(), 2);
        assert_eq!(all.then.len(), 2);
        assert_eq!(all.then[1].outcome_key(), "NotifyBackorder -> Inventory");

        let any = &spec.reactions[2];
        assert_eq!(any.mode, TriggerMode::Policy);
        assert_eq!(any.actor.as_deref(), Some("support-agent"));
        assert_eq!(any.when.label(), "any(PaymentFailed, PaymentExpired)");
    }

    #[test]
    fn all_trigger_requires_correlate() {
        let text = FULFILLMENT.replace("    correlate: orderId\n", "");
        let issues = parse(&text).unwrap_err();
        let missing: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::MissingCorrelate)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].path.to_string().starts_with("reactions[1]"));
    }

    #[test]
    fn undeclared_source_rejected() {
        let text = FULFILLMENT.replace(
            "reacts_to: [Order, Inventory, Payment]",
            "reacts_to: [Order, Inventory]",
        );
        let issues = parse(&text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::UndeclaredSource && i.message.contains("Payment")));
    }

    #[test]
    fn undeclared_target_rejected() {
        let text = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Inventory, Payment]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: ReleaseInventory -> Fulfillment
    Outcome:
      - released
"#;
        let issues = parse(text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::UndeclaredTarget && i.message.contains("Fulfillment")));
    }

    #[test]
    fn policy_without_actor_rejected() {
        let text = FULFILLMENT.replace("    actor: support-agent\n", "");
        let issues = parse(&text).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::MissingActor));
    }

    #[test]
    fn scalar_trigger_requires_from() {
        let text = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order]
emits_to: [Inventory]
model: ./m.ts
reactions:
  - When: OrderPlaced
    Then: ReserveStock -> Inventory
    Outcome:
      - requested
"#;
        let issues = parse(text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::MissingField && i.message.contains("From")));
    }

    #[test]
    fn any_trigger_requires_two_distinct_events() {
        let text = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Payment]
emits_to: [Inventory]
model: ./m.ts
reactions:
  - When:
      any: [PaymentFailed]
    From: Payment
    Then: CancelOrder -> Inventory
    Outcome:
      - cancelled
"#;
        let issues = parse(text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::TypeMismatch && i.message.contains("at least two")));
    }

    #[test]
    fn outcome_key_must_match_dispatch_form() {
        let text = r#"
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
      ReserveStock -> Payment:
        - wrong
"#;
        let issues = parse(text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::OutcomeKeyMismatch
                && i.message.contains("ReserveStock -> Payment")));
    }

    #[test]
    fn bare_all_entries_use_shared_from() {
        let text = r#"
ubispec: process/v1.0
process: Settlement
reacts_to: [Ledger]
emits_to: [Ledger]
model: ./m.ts
reactions:
  - When:
      all: [DebitPosted, CreditPosted]
    From: Ledger
    correlate: transferId
    Then: CloseTransfer -> Ledger
    Outcome:
      - transfer-closed
"#;
        let parsed = parse(text).unwrap();
        let Trigger::All { entries, correlate } = &parsed.spec.reactions[0].when else {
            panic!("expected all trigger");
        };
        assert_eq!(correlate, "transferId");
        assert!(entries.iter().all(|e| e.source.as_str() == "Ledger" && !e.explicit_source));
    }
}
