//! Typed models and per-document validation for UbiSpec documents.
//!
//! Three document kinds share one pattern: a raw value tree (from
//! `ubispec-core`'s [`Document`](ubispec_core::Document)) is walked by a
//! fail-collecting parser that returns either a validated spec (plus any
//! advisory issues) or the complete list of structural and reference
//! problems. [`serialize`] turns validated trees back into canonical
//! document values without information loss.

pub mod lifecycle;
pub mod process;
pub mod serialize;
pub mod system;
pub mod walk;

use ubispec_core::Issue;

pub use lifecycle::{
    parse_lifecycle, Decision, EventSpec, LifecycleSpec, OutcomeCase, OutcomeSpec,
};
pub use process::{
    parse_process, AllEntry, DispatchSpec, ProcessSpec, Reaction, Trigger, TriggerMode,
};
pub use serialize::{lifecycle_to_value, process_to_value, system_to_value};
pub use system::{parse_system, Flow, Module, SystemSpec};

/// A successfully validated spec together with its advisory issues.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub spec: T,
    /// Advisory-severity issues only; never blocks derivation.
    pub advisories: Vec<Issue>,
}
