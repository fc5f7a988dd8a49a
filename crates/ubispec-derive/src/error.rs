//! Error types for the derivation engine.

/// Errors from artifact derivation.
#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("'{subject}' has outstanding validation errors; derivation refused")]
    NotValidated { subject: String },

    #[error("no validated spec named '{subject}' in the set")]
    UnknownSubject { subject: String },

    #[error("decider '{decider}' has no decision for command '{command}'")]
    UnknownCommand { decider: String, command: String },
}
