//! Shape-preserving re-serialization of validated spec trees.
//!
//! Parsing a document, serializing the validated tree, and re-parsing the
//! result yields a structurally equal tree: nothing is lost through the
//! parse/validate boundary. Serialization emits the canonical textual forms
//! (bare strings for unconditional entries, single-key mappings for
//! conditional ones).

use serde_json::{json, Map, Value};

use ubispec_core::{ConstraintList, PredicateEntry};

use crate::lifecycle::{Decision, EventSpec, LifecycleSpec, OutcomeSpec};
use crate::process::{DispatchSpec, ProcessSpec, Reaction, Trigger, TriggerMode};
use crate::system::SystemSpec;

/// Serialize a Lifecycle spec back to a document value tree.
pub fn lifecycle_to_value(spec: &LifecycleSpec) -> Value {
    let mut map = Map::new();
    map.insert("ubispec".into(), json!(spec.version.to_string()));
    map.insert("decider".into(), json!(spec.decider.as_str()));
    map.insert("identity".into(), json!(spec.identity));
    map.insert("model".into(), json!(spec.model));
    if !spec.common.is_empty() {
        let common: Map<String, Value> = spec
            .common
            .iter()
            .map(|(name, expr)| (name.as_str().to_string(), json!(expr.as_str())))
            .collect();
        map.insert("common".into(), Value::Object(common));
    }
    let decisions: Vec<Value> = spec.lifecycle.iter().map(decision_to_value).collect();
    map.insert("lifecycle".into(), Value::Array(decisions));
    Value::Object(map)
}

fn decision_to_value(decision: &Decision) -> Value {
    let mut map = Map::new();
    map.insert("When".into(), json!(decision.when.as_str()));
    if let Some(actor) = &decision.actor {
        map.insert("actor".into(), json!(actor));
    }
    if let Some(and) = &decision.and {
        map.insert("And".into(), constraint_list_to_value(and));
    }
    map.insert("Then".into(), then_to_value(&decision.then));
    map.insert("Outcome".into(), outcome_to_value(&decision.outcome));
    Value::Object(map)
}

fn then_to_value(then: &[EventSpec]) -> Value {
    if let [EventSpec::Unconditional(event)] = then {
        return json!(event.as_str());
    }
    let entries: Vec<Value> = then
        .iter()
        .map(|entry| match entry {
            EventSpec::Unconditional(event) => json!(event.as_str()),
            EventSpec::Conditional { event, conditions } => {
                let mut map = Map::new();
                map.insert(event.as_str().to_string(), constraint_list_to_value(conditions));
                Value::Object(map)
            }
        })
        .collect();
    Value::Array(entries)
}

fn constraint_list_to_value(list: &ConstraintList) -> Value {
    Value::Array(list.entries().iter().map(predicate_entry_to_value).collect())
}

fn predicate_entry_to_value(entry: &PredicateEntry) -> Value {
    match entry {
        PredicateEntry::Reference(name) => json!(name.as_str()),
        PredicateEntry::Inline { name, expr } => {
            let mut map = Map::new();
            map.insert(name.as_str().to_string(), json!(expr.as_str()));
            Value::Object(map)
        }
    }
}

fn assertions_to_value(assertions: &[PredicateEntry]) -> Value {
    Value::Array(assertions.iter().map(predicate_entry_to_value).collect())
}

fn outcome_to_value(outcome: &OutcomeSpec) -> Value {
    match outcome {
        OutcomeSpec::Flat(assertions) => assertions_to_value(assertions),
        OutcomeSpec::Keyed { always, cases } => {
            let mut map = Map::new();
            if let Some(always) = always {
                map.insert("_always".into(), assertions_to_value(always));
            }
            for case in cases {
                map.insert(case.key.clone(), assertions_to_value(&case.assertions));
            }
            Value::Object(map)
        }
    }
}

/// Serialize a Process spec back to a document value tree.
pub fn process_to_value(spec: &ProcessSpec) -> Value {
    let mut map = Map::new();
    map.insert("ubispec".into(), json!(spec.version.to_string()));
    map.insert("process".into(), json!(spec.process.as_str()));
    map.insert(
        "reacts_to".into(),
        Value::Array(spec.reacts_to.iter().map(|d| json!(d.as_str())).collect()),
    );
    map.insert(
        "emits_to".into(),
        Value::Array(spec.emits_to.iter().map(|d| json!(d.as_str())).collect()),
    );
    map.insert("model".into(), json!(spec.model));
    if let Some(state) = &spec.state {
        let state: Map<String, Value> = state
            .iter()
            .map(|(field, type_expr)| (field.clone(), json!(type_expr)))
            .collect();
        map.insert("state".into(), Value::Object(state));
    }
    if !spec.common.is_empty() {
        let common: Map<String, Value> = spec
            .common
            .iter()
            .map(|(name, expr)| (name.as_str().to_string(), json!(expr.as_str())))
            .collect();
        map.insert("common".into(), Value::Object(common));
    }
    let reactions: Vec<Value> = spec.reactions.iter().map(reaction_to_value).collect();
    map.insert("reactions".into(), Value::Array(reactions));
    Value::Object(map)
}

fn reaction_to_value(reaction: &Reaction) -> Value {
    let mut map = Map::new();
    match &reaction.when {
        Trigger::Scalar { event, source } => {
            map.insert("When".into(), json!(event.as_str()));
            map.insert("From".into(), json!(source.as_str()));
        }
        Trigger::Any { events, source } => {
            let names: Vec<Value> = events.iter().map(|e| json!(e.as_str())).collect();
            map.insert("When".into(), json!({ "any": names }));
            map.insert("From".into(), json!(source.as_str()));
        }
        Trigger::All { entries, correlate } => {
            let rendered: Vec<Value> = entries
                .iter()
                .map(|entry| {
                    if entry.explicit_source {
                        json!(format!("{} from {}", entry.event, entry.source))
                    } else {
                        json!(entry.event.as_str())
                    }
                })
                .collect();
            map.insert("When".into(), json!({ "all": rendered }));
            if let Some(shared) = entries.iter().find(|e| !e.explicit_source) {
                map.insert("From".into(), json!(shared.source.as_str()));
            }
            map.insert("correlate".into(), json!(correlate));
        }
    }
    if reaction.mode == TriggerMode::Policy {
        map.insert("trigger".into(), json!(reaction.mode.as_str()));
    }
    if let Some(actor) = &reaction.actor {
        map.insert("actor".into(), json!(actor));
    }
    if let Some(and) = &reaction.and {
        map.insert("And".into(), constraint_list_to_value(and));
    }
    map.insert("Then".into(), dispatches_to_value(&reaction.then));
    map.insert("Outcome".into(), outcome_to_value(&reaction.outcome));
    Value::Object(map)
}

fn dispatches_to_value(then: &[DispatchSpec]) -> Value {
    if let [dispatch] = then {
        if dispatch.conditions.is_none() {
            return json!(dispatch.outcome_key());
        }
    }
    let entries: Vec<Value> = then
        .iter()
        .map(|dispatch| match &dispatch.conditions {
            None => json!(dispatch.outcome_key()),
            Some(conditions) => {
                let mut map = Map::new();
                map.insert(dispatch.outcome_key(), constraint_list_to_value(conditions));
                Value::Object(map)
            }
        })
        .collect();
    Value::Array(entries)
}

/// Serialize a System spec back to a document value tree.
pub fn system_to_value(spec: &SystemSpec) -> Value {
    let mut map = Map::new();
    map.insert("ubispec".into(), json!(spec.version.to_string()));
    map.insert("system".into(), json!(spec.system.as_str()));
    if let Some(description) = &spec.description {
        map.insert("description".into(), json!(description));
    }
    let modules: Vec<Value> = spec
        .modules
        .iter()
        .map(|module| {
            let mut m = Map::new();
            m.insert("name".into(), json!(module.name.as_str()));
            m.insert("context".into(), json!(module.context.as_str()));
            m.insert(
                "deciders".into(),
                Value::Array(module.deciders.iter().map(|d| json!(d.as_str())).collect()),
            );
            if let Some(description) = &module.description {
                m.insert("description".into(), json!(description));
            }
            Value::Object(m)
        })
        .collect();
    map.insert("modules".into(), Value::Array(modules));
    if !spec.flows.is_empty() {
        let flows: Vec<Value> = spec
            .flows
            .iter()
            .map(|flow| {
                let mut f = Map::new();
                f.insert("event".into(), json!(flow.event.as_str()));
                f.insert("from".into(), json!(flow.from.as_str()));
                f.insert("triggers".into(), json!(flow.triggers.as_str()));
                f.insert("on".into(), json!(flow.on.as_str()));
                if flow.mode == TriggerMode::Policy {
                    f.insert("trigger".into(), json!(flow.mode.as_str()));
                }
                if let Some(actor) = &flow.actor {
                    f.insert("actor".into(), json!(actor));
                }
                Value::Object(f)
            })
            .collect();
        map.insert("flows".into(), Value::Array(flows));
    }
    Value::Object(map)
}
