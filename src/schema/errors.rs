//! Error types for declarations and record validation
//!
//! Two separate families:
//! - `DeclarationError`: a malformed declaration. Raised when a declaration
//!   is built, loaded or registered, never while validating data.
//! - `ValidationError`: every violation found in one input record.
//!
//! Violation kinds:
//! - missing (required field absent)
//! - type_error (value not losslessly convertible to the declared type)
//! - constraint_violation (built-in constraint or custom check failed)
//! - unknown_field (undeclared key under the `reject` policy)

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Result type for declaration construction and loading
pub type DeclarationResult<T> = Result<T, DeclarationError>;

/// A declaration that cannot be used for validation.
#[derive(Debug, Error)]
pub enum DeclarationError {
    // ==================
    // Structure Errors
    // ==================
    /// Two fields in one record share a name
    #[error("Duplicate field '{field}' in record '{record}'")]
    DuplicateField { record: String, field: String },

    /// Enum type with no allowed literals
    #[error("Enum field '{0}' declares no allowed values")]
    EmptyEnum(String),

    /// Constraint attached to a type it cannot check
    #[error("Constraint '{constraint}' does not apply to {type_name} field '{field}'")]
    InapplicableConstraint {
        field: String,
        constraint: String,
        type_name: String,
    },

    /// Constraints that no value could satisfy together
    #[error("Conflicting constraints on field '{field}': {reason}")]
    ConflictingConstraints { field: String, reason: String },

    /// Pattern constraint that does not compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Default value that would itself fail validation
    #[error("Default for field '{field}' does not conform to {expected}")]
    InvalidDefault { field: String, expected: String },

    /// Field marked required while also carrying a default
    #[error("Required field '{0}' cannot declare a default")]
    RequiredWithDefault(String),

    /// Record check reading a field the record does not declare
    #[error("Record check '{check}' references undeclared field '{field}'")]
    UnknownCheckField { check: String, field: String },

    // ==================
    // Registry Errors
    // ==================
    /// Declaration name not registered
    #[error("Declaration '{0}' not found")]
    NotFound(String),

    /// Declaration name already registered (declarations are immutable)
    #[error("Declaration '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Declaration file already on disk; saved files are never overwritten
    #[error("Declaration file '{0}' already exists")]
    FileExists(String),

    /// Declaration file could not be parsed
    #[error("Malformed declaration file '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// Filesystem failure while loading or saving
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Kind of a single data violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required field absent
    Missing,
    /// Value could not be coerced to the declared type
    TypeError,
    /// Value coerced but failed a constraint or check
    ConstraintViolation,
    /// Undeclared key under the `reject` policy
    UnknownField,
}

impl ViolationKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::Missing => "missing",
            ViolationKind::TypeError => "type_error",
            ViolationKind::ConstraintViolation => "constraint_violation",
            ViolationKind::UnknownField => "unknown_field",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One violation found in an input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field path (e.g., "teams[0].name")
    pub path: String,
    /// Violation kind
    pub kind: ViolationKind,
    /// Human-readable message
    pub message: String,
    /// Constraint or check name, for constraint violations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Expected type or bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Actual type or value found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Violation {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ViolationKind::Missing,
            message: "field required".into(),
            constraint: None,
            expected: None,
            actual: None,
        }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        Self {
            path: path.into(),
            kind: ViolationKind::TypeError,
            message: format!("expected {}, got {}", expected, actual),
            constraint: None,
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    pub fn constraint(
        path: impl Into<String>,
        constraint: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ViolationKind::ConstraintViolation,
            message: message.into(),
            constraint: Some(constraint.into()),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    /// A caller-supplied check rejected the value
    pub fn check_failed(
        path: impl Into<String>,
        check: impl Into<String>,
        actual: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ViolationKind::ConstraintViolation,
            message: message.into(),
            constraint: Some(check.into()),
            expected: None,
            actual,
        }
    }

    pub fn unknown_field(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ViolationKind::UnknownField,
            message: "undeclared field not permitted".into(),
            constraint: None,
            expected: None,
            actual: None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': [{}] {}", self.path, self.kind, self.message)
    }
}

/// All violations found while validating one record.
///
/// Never empty when returned from validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Name of the root declaration
    record: String,
    /// Violations in deterministic order
    violations: Vec<Violation>,
}

impl ValidationError {
    pub(crate) fn new(record: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            record: record.into(),
            violations,
        }
    }

    /// Returns the root declaration name
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Returns the violations in order
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes the error, returning the violations
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Returns the number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns whether no violations were recorded
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the violations of one kind
    pub fn by_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Returns the violations at one path
    pub fn at_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.path == path)
    }

    /// Returns the violation paths in order
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }

    /// Renders the violation list as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.violations).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record '{}' failed validation with {} violation(s)",
            self.record,
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
