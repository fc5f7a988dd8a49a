//! The System topology model: modules and cross-module flows.
//!
//! A System document groups deciders into modules and declares the
//! event-to-command flows between modules. Intra-module coordination
//! belongs in a Process spec, so a flow may never point at its own module.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ubispec_core::{FormatVersion, Issue, IssueCode, PascalIdent, SpecKind};

use crate::lifecycle::parse_header;
use crate::process::TriggerMode;
use crate::walk::{self, opt_str, req_seq, Collector};
use crate::Parsed;

/// A bounded-context module grouping one or more deciders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: PascalIdent,
    pub context: PascalIdent,
    pub deciders: Vec<PascalIdent>,
    pub description: Option<String>,
}

/// One cross-module flow: an event from one module triggering a command on
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub event: PascalIdent,
    pub from: PascalIdent,
    pub triggers: PascalIdent,
    pub on: PascalIdent,
    pub mode: TriggerMode,
    pub actor: Option<String>,
}

/// A validated System document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSpec {
    pub version: FormatVersion,
    pub system: PascalIdent,
    pub description: Option<String>,
    pub modules: Vec<Module>,
    pub flows: Vec<Flow>,
}

impl SystemSpec {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name.as_str() == name)
    }
}

/// Parse and validate one System document, collecting every issue.
pub fn parse_system(root: &Value) -> Result<Parsed<SystemSpec>, Vec<Issue>> {
    let mut c = Collector::new();
    let Some(map) = walk::as_object(root, &mut c) else {
        return Err(c.into_issues());
    };

    let version = parse_header(map, SpecKind::System, &mut c);
    let system = walk::req_pascal(map, "system", &mut c);
    let description = opt_str(map, "description", &mut c).map(str::to_string);

    let mut modules = Vec::new();
    let mut module_names: Vec<String> = Vec::new();
    if let Some(seq) = req_seq(map, "modules", &mut c) {
        c.push_field("modules");
        for (idx, value) in seq.iter().enumerate() {
            c.push_index(idx);
            if let Some(module) = parse_module(value, &mut c) {
                if module_names.contains(&module.name.as_str().to_string()) {
                    c.report_at(
                        "name",
                        IssueCode::DuplicateModule,
                        format!("module '{}' is declared more than once", module.name),
                    );
                } else {
                    module_names.push(module.name.as_str().to_string());
                    modules.push(module);
                }
            }
            c.pop();
        }
        c.pop();
    }

    // Flows default to empty.
    let mut flows = Vec::new();
    if let Some(value) = map.get("flows") {
        c.push_field("flows");
        match value.as_array() {
            None => c.report(IssueCode::TypeMismatch, "'flows' must be a sequence"),
            Some(seq) => {
                for (idx, flow_value) in seq.iter().enumerate() {
                    c.push_index(idx);
                    if let Some(flow) = parse_flow(flow_value, &module_names, &mut c) {
                        flows.push(flow);
                    }
                    c.pop();
                }
            }
        }
        c.pop();
    }

    if c.has_errors() {
        return Err(c.into_issues());
    }

    let spec = SystemSpec {
        version: version.expect("no errors collected"),
        system: system.expect("no errors collected"),
        description,
        modules,
        flows,
    };
    Ok(Parsed {
        spec,
        advisories: c.into_issues(),
    })
}

fn parse_module(value: &Value, c: &mut Collector) -> Option<Module> {
    let map = walk::as_object(value, c)?;
    let name = walk::req_pascal(map, "name", c);
    let context = walk::req_pascal(map, "context", c);
    let description = opt_str(map, "description", c).map(str::to_string);

    let deciders = req_seq(map, "deciders", c).and_then(|seq| {
        c.push_field("deciders");
        let mut deciders = Vec::with_capacity(seq.len());
        let mut complete = true;
        for (idx, entry) in seq.iter().enumerate() {
            c.push_index(idx);
            match entry.as_str() {
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
    });

    Some(Module {
        name: name?,
        context: context?,
        deciders: deciders?,
        description,
    })
}

fn parse_flow(value: &Value, module_names: &[String], c: &mut Collector) -> Option<Flow> {
    let map = walk::as_object(value, c)?;
    let event = walk::req_pascal(map, "event", c);
    let from = walk::req_pascal(map, "from", c);
    let triggers = walk::req_pascal(map, "triggers", c);
    let on = walk::req_pascal(map, "on", c);

    for (field, module) in [("from", &from), ("on", &on)] {
        if let Some(module) = module {
            if !module_names.iter().any(|name| name == module.as_str()) {
                c.report_at(
                    field,
                    IssueCode::UndeclaredModule,
                    format!("module '{module}' is not declared in this document"),
                );
            }
        }
    }
    if let (Some(from), Some(on)) = (&from, &on) {
        if from == on {
            c.report_at(
                "on",
                IssueCode::SelfFlow,
                format!("flow from '{from}' to itself; use a Process spec for intra-module coordination"),
            );
        }
    }

    let mode = match opt_str(map, "trigger", c) {
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
    let actor = opt_str(map, "actor", c).map(str::to_string);
    if mode == TriggerMode::Policy && actor.as_deref().map_or(true, str::is_empty) {
        c.report_at("actor", IssueCode::MissingActor, "policy flows require an actor");
    }

    Some(Flow {
        event: event?,
        from: from?,
        triggers: triggers?,
        on: on?,
        mode,
        actor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ubispec_core::Document;

    const COMMERCE: &str = r#"
ubispec: system/v1.0
system: Commerce
description: Ordering and fulfillment
modules:
  - name: Ordering
    context: Sales
    deciders: [Order, Cart]
  - name: Warehouse
    context: Logistics
    deciders: [Inventory]
    description: Stock management
flows:
  - event: OrderPlaced
    from: Ordering
    triggers: ReserveStock
    on: Warehouse
  - event: StockExhausted
    from: Warehouse
    triggers: PauseListing
    on: Ordering
    trigger: policy
    actor: merchandiser
"#;

    fn parse(text: &str) -> Result<Parsed<SystemSpec>, Vec<Issue>> {
        let doc = Document::from_yaml_str("test", text).unwrap();
        parse_system(&doc.root)
    }

    #[test]
    fn parse_full_document() {
        let parsed = parse(COMMERCE).unwrap();
        let spec = &parsed.spec;
        assert_eq!(spec.system.as_str(), "Commerce");
        assert_eq!(spec.modules.len(), 2);
        assert_eq!(spec.flows.len(), 2);
        assert_eq!(spec.flows[1].mode, TriggerMode::Policy);
        assert!(spec.module("Warehouse").is_some());
        assert!(spec.module("Unknown").is_none());
    }

    #[test]
    fn flows_default_to_empty() {
        let text = r#"
ubispec: system/v1.0
system: Commerce
modules:
  - name: Ordering
    context: Sales
    deciders: [Order]
"#;
        let parsed = parse(text).unwrap();
        assert!(parsed.spec.flows.is_empty());
    }

    #[test]
    fn undeclared_module_rejected() {
        let text = COMMERCE.replace("on: Warehouse", "on: Shipping");
        let issues = parse(&text).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::UndeclaredModule && i.message.contains("Shipping")));
    }

    #[test]
    fn self_flow_rejected() {
        let text = COMMERCE.replace("on: Warehouse", "on: Ordering");
        let issues = parse(&text).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::SelfFlow));
    }

    #[test]
    fn duplicate_module_rejected() {
        let text = COMMERCE.replace("name: Warehouse", "name: Ordering");
        let issues = parse(&text).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::DuplicateModule));
    }

    #[test]
    fn policy_flow_requires_actor() {
        let text = COMMERCE.replace("    actor: merchandiser\n", "");
        let issues = parse(&text).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::MissingActor));
    }
}
