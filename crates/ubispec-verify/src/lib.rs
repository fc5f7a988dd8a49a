//! Cross-document validation for UbiSpec document sets.
//!
//! Single documents are validated by `ubispec-schema`; this crate resolves
//! the soft name references between documents (trigger events against
//! declared `Then` events, dispatched commands against declared `When`
//! commands, decider presence, correlate-field existence) and aggregates
//! everything into one [`ValidationReport`]. The [`ValidatedSet`] it
//! produces is the only gateway to the derivation engine.

pub mod cross;
pub mod engine;
pub mod fields;
pub mod index;
pub mod report;
pub mod validated;

pub use cross::{cross_validate, CrossOptions, ExternalDeciderPolicy};
pub use engine::validate_documents;
pub use fields::{EventFieldLookup, FieldPresence, NoModel, StaticFieldIndex};
pub use index::{Indexed, SpecSet};
pub use report::{DocumentReport, ReportSummary, ValidationReport};
pub use validated::{SpecAccess, ValidatedSet};
