//! recordgate - declarative validation of nested API records
//!
//! Build a `RecordDeclaration` once, then validate untyped JSON records
//! against it. Success yields a `ValidatedRecord` of typed values (plus the
//! extra fields bag under `allow-and-report`); failure yields a
//! `ValidationError` listing every violation with its path.

pub mod config;
pub mod observability;
pub mod schema;

pub use config::{CoercionMode, ValidatorConfig};
pub use schema::{
    validate, Constraint, DeclarationError, ExtraPolicy, FieldCheck, FieldDef, RecordCheck,
    RecordDeclaration, SchemaValidator, TypeSpec, TypedValue, ValidatedRecord, ValidationError,
    Violation, ViolationKind,
};
