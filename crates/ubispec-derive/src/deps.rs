//! Integration-dependency manifest derivation.
//!
//! Any predicate referencing `dm.ctx` or `rm.ctx` creates a shell contract:
//! data the runtime must resolve externally before logic runs. The scan
//! covers every predicate value at any detail level, picks up embedded
//! `# shell: <hint>` lines, and groups records by command/reaction and then
//! by the service inferred from the hint's leading identifier.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use ubispec_core::{DetailLevel, PredicateEntry, PredicateExpression};
use ubispec_schema::{LifecycleSpec, ProcessSpec};
use ubispec_verify::ValidatedSet;

use crate::output::ArtifactOutput;

/// Which context namespace the dependency was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CtxKind {
    /// `dm.ctx`: resolved before a Decision runs.
    Dm,
    /// `rm.ctx`: resolved before a Reaction runs.
    Rm,
}

impl CtxKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            CtxKind::Dm => "dm.ctx",
            CtxKind::Rm => "rm.ctx",
        }
    }
}

/// One discovered shell contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    /// Decider or process name.
    pub owner: String,
    /// Command name, or the reaction's trigger label.
    pub site: String,
    /// Name of the predicate the reference appears in.
    pub predicate: String,
    pub context: CtxKind,
    /// External service inferred from the hint; `None` when unresolved.
    pub service: Option<String>,
    /// The raw `# shell:` hint, when present. Scope-annotation-only
    /// predicates carry no resolution hint.
    pub hint: Option<String>,
}

/// The derived dependency manifest across the whole validated set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyManifest {
    pub records: Vec<DependencyRecord>,
}

impl DependencyManifest {
    /// Records grouped by `(owner, site)` and then by service label.
    pub fn grouped(&self) -> BTreeMap<(String, String), BTreeMap<String, Vec<&DependencyRecord>>> {
        let mut groups: BTreeMap<(String, String), BTreeMap<String, Vec<&DependencyRecord>>> =
            BTreeMap::new();
        for record in &self.records {
            let service = record.service.clone().unwrap_or_else(|| "(unresolved)".to_string());
            groups
                .entry((record.owner.clone(), record.site.clone()))
                .or_default()
                .entry(service)
                .or_default()
                .push(record);
        }
        groups
    }

    pub fn output(&self) -> ArtifactOutput {
        let mut text = String::from("## Integration dependencies\n");
        for ((owner, site), services) in self.grouped() {
            text.push_str(&format!("\n### {owner} / {site}\n"));
            for (service, records) in services {
                text.push_str(&format!("- {service}\n"));
                for record in records {
                    let hint = record.hint.as_deref().unwrap_or("(no hint)");
                    text.push_str(&format!(
                        "  - {} [{}] {hint}\n",
                        record.predicate,
                        record.context.prefix()
                    ));
                }
            }
        }
        let data = json!({
            "artifact": "dependency-manifest",
            "records": self.records,
        });
        ArtifactOutput { text, data }
    }
}

/// Scan every derivable document for shell contracts.
pub fn dependency_manifest(set: &ValidatedSet) -> DependencyManifest {
    let mut manifest = DependencyManifest::default();
    for spec in set.lifecycles() {
        scan_lifecycle(spec, &mut manifest);
    }
    for spec in set.processes() {
        scan_process(spec, &mut manifest);
    }
    manifest
}

fn scan_lifecycle(spec: &LifecycleSpec, manifest: &mut DependencyManifest) {
    let owner = spec.decider.as_str();
    for decision in &spec.lifecycle {
        let site = decision.when.as_str();
        let mut scan_entry = |entry: &PredicateEntry| {
            let expr = match entry {
                PredicateEntry::Inline { expr, .. } => Some(expr),
                PredicateEntry::Reference(name) => spec.common.get(name),
            };
            if let Some(expr) = expr {
                scan_expression(owner, site, entry.name().as_str(), expr, manifest);
            }
        };

        if let Some(and) = &decision.and {
            and.entries().iter().for_each(&mut scan_entry);
        }
        for event in &decision.then {
            if let Some(conditions) = event.conditions() {
                conditions.entries().iter().for_each(&mut scan_entry);
            }
        }
        for assertion in outcome_entries(&decision.outcome) {
            scan_entry(assertion);
        }
    }
}

fn scan_process(spec: &ProcessSpec, manifest: &mut DependencyManifest) {
    let owner = spec.process.as_str();
    for reaction in &spec.reactions {
        let site = reaction.when.label();
        let mut scan_entry = |entry: &PredicateEntry| {
            let expr = match entry {
                PredicateEntry::Inline { expr, .. } => Some(expr),
                PredicateEntry::Reference(name) => spec.common.get(name),
            };
            if let Some(expr) = expr {
                scan_expression(owner, &site, entry.name().as_str(), expr, manifest);
            }
        };

        if let Some(and) = &reaction.and {
            and.entries().iter().for_each(&mut scan_entry);
        }
        for dispatch in &reaction.then {
            if let Some(conditions) = &dispatch.conditions {
                conditions.entries().iter().for_each(&mut scan_entry);
            }
        }
        for assertion in outcome_entries(&reaction.outcome) {
            scan_entry(assertion);
        }
    }
}

fn outcome_entries(outcome: &ubispec_schema::OutcomeSpec) -> Vec<&PredicateEntry> {
    use ubispec_schema::OutcomeSpec;
    match outcome {
        OutcomeSpec::Flat(assertions) => assertions.iter().collect(),
        OutcomeSpec::Keyed { always, cases } => {
            let mut entries: Vec<&PredicateEntry> =
                always.iter().flat_map(|a| a.iter()).collect();
            for case in cases {
                entries.extend(case.assertions.iter());
            }
            entries
        }
    }
}

fn scan_expression(
    owner: &str,
    site: &str,
    predicate: &str,
    expr: &PredicateExpression,
    manifest: &mut DependencyManifest,
) {
    let text = expr.as_str();
    for context in [CtxKind::Dm, CtxKind::Rm] {
        if !text.contains(context.prefix()) {
            continue;
        }
        // Scope annotations name the dependency without resolving it.
        let hint = if expr.classify() == DetailLevel::Scope {
            None
        } else {
            extract_shell_hint(text)
        };
        let service = hint.as_deref().map(leading_service).map(str::to_string);
        let record = DependencyRecord {
            owner: owner.to_string(),
            site: site.to_string(),
            predicate: predicate.to_string(),
            context,
            service,
            hint,
        };
        if !manifest.records.contains(&record) {
            manifest.records.push(record);
        }
    }
}

/// Find an embedded `# shell: <hint>` line in the expression text.
fn extract_shell_hint(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some((_, rest)) = line.split_once("# shell:") {
            let hint = rest.trim();
            if !hint.is_empty() {
                return Some(hint.to_string());
            }
        }
    }
    None
}

/// The hint's leading identifier before the first `.`.
fn leading_service(hint: &str) -> &str {
    let end = hint.find(|c: char| c == '.' || c.is_whitespace()).unwrap_or(hint.len());
    &hint[..end]
}
