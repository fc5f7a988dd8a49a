//! The model-types collaborator interface.
//!
//! The correlate-field check of All triggers needs to know whether an event
//! payload declares a named field. That knowledge lives in the external
//! model-types component, so the validator only sees this trait. When no
//! model is available the lookup answers [`FieldPresence::Unknown`] and the
//! check is skipped.

use std::collections::{BTreeMap, BTreeSet};

/// Answer to "does event E declare field F?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPresence {
    Present,
    Absent,
    /// The model does not cover this event; the check is skipped.
    Unknown,
}

/// Lookup into the external model-types component.
pub trait EventFieldLookup {
    fn field(&self, event: &str, field: &str) -> FieldPresence;
}

/// A lookup with no model behind it: every answer is `Unknown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModel;

impl EventFieldLookup for NoModel {
    fn field(&self, _event: &str, _field: &str) -> FieldPresence {
        FieldPresence::Unknown
    }
}

/// A static field index seeded from configuration or test fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldIndex {
    events: BTreeMap<String, BTreeSet<String>>,
}

impl StaticFieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an event's payload fields. Declaring an event twice merges
    /// the field sets.
    pub fn declare<I, S>(&mut self, event: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events
            .entry(event.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventFieldLookup for StaticFieldIndex {
    fn field(&self, event: &str, field: &str) -> FieldPresence {
        match self.events.get(event) {
            None => FieldPresence::Unknown,
            Some(fields) if fields.contains(field) => FieldPresence::Present,
            Some(_) => FieldPresence::Absent,
        }
    }
}
