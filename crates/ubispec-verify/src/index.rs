//! The spec-set name index.
//!
//! Cross-document references are plain strings resolved through lookup
//! tables keyed by `(document kind, name)`, never object pointers, so
//! Lifecycle and Process specs can reference each other freely without an
//! ownership cycle.

use std::collections::{BTreeMap, BTreeSet};

use ubispec_schema::{LifecycleSpec, ProcessSpec, SystemSpec};

/// A spec stored together with the document it was parsed from.
#[derive(Debug, Clone)]
pub struct Indexed<T> {
    /// Document identity (the loaded file's name), used in reports.
    pub document: String,
    pub spec: T,
}

/// All validated specs of one repository, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct SpecSet {
    lifecycles: BTreeMap<String, Indexed<LifecycleSpec>>,
    processes: BTreeMap<String, Indexed<ProcessSpec>>,
    system: Option<Indexed<SystemSpec>>,
}

impl SpecSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a lifecycle spec under its decider name. The first document
    /// for a decider wins; returns `false` if the name was already taken.
    pub fn add_lifecycle(&mut self, document: impl Into<String>, spec: LifecycleSpec) -> bool {
        let key = spec.decider.as_str().to_string();
        if self.lifecycles.contains_key(&key) {
            return false;
        }
        self.lifecycles.insert(
            key,
            Indexed {
                document: document.into(),
                spec,
            },
        );
        true
    }

    /// Index a process spec under its process name.
    pub fn add_process(&mut self, document: impl Into<String>, spec: ProcessSpec) -> bool {
        let key = spec.process.as_str().to_string();
        if self.processes.contains_key(&key) {
            return false;
        }
        self.processes.insert(
            key,
            Indexed {
                document: document.into(),
                spec,
            },
        );
        true
    }

    pub fn set_system(&mut self, document: impl Into<String>, spec: SystemSpec) {
        self.system = Some(Indexed {
            document: document.into(),
            spec,
        });
    }

    pub fn lifecycle(&self, decider: &str) -> Option<&Indexed<LifecycleSpec>> {
        self.lifecycles.get(decider)
    }

    pub fn process(&self, name: &str) -> Option<&Indexed<ProcessSpec>> {
        self.processes.get(name)
    }

    pub fn system(&self) -> Option<&Indexed<SystemSpec>> {
        self.system.as_ref()
    }

    pub fn lifecycles(&self) -> impl Iterator<Item = &Indexed<LifecycleSpec>> {
        self.lifecycles.values()
    }

    pub fn processes(&self) -> impl Iterator<Item = &Indexed<ProcessSpec>> {
        self.processes.values()
    }

    /// Whether a Lifecycle document exists for this decider.
    pub fn has_decider(&self, name: &str) -> bool {
        self.lifecycles.contains_key(name)
    }

    /// Every event the named decider declares in any `Then` block.
    pub fn decider_events(&self, name: &str) -> Option<BTreeSet<&str>> {
        self.lifecycles
            .get(name)
            .map(|entry| entry.spec.declared_events().iter().map(|e| e.as_str()).collect())
    }

    /// Every command the named decider accepts as a `When`.
    pub fn decider_commands(&self, name: &str) -> Option<BTreeSet<&str>> {
        self.lifecycles
            .get(name)
            .map(|entry| entry.spec.declared_commands().iter().map(|e| e.as_str()).collect())
    }
}
