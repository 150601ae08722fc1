//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events emitted by the validator and loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Validation
    /// Record passed validation
    RecordValidated,
    /// Record failed validation
    RecordRejected,
    /// Undeclared key kept under `allow-and-report`
    ExtraFieldDetected,

    // Declarations
    /// Declaration files loaded from disk
    DeclarationsLoaded,
    /// Declaration written to disk
    DeclarationSaved,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RecordValidated => "RECORD_VALIDATED",
            Event::RecordRejected => "RECORD_REJECTED",
            Event::ExtraFieldDetected => "EXTRA_FIELD_DETECTED",
            Event::DeclarationsLoaded => "DECLARATIONS_LOADED",
            Event::DeclarationSaved => "DECLARATION_SAVED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
