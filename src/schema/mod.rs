//! Schema validator subsystem
//!
//! A declaration describes a record: named fields, each with a semantic
//! type, optional constraints and custom checks, plus a policy for
//! undeclared keys. The validator coerces an untyped JSON record against
//! it and returns either a fully typed record or every violation found.
//!
//! # Design Principles
//!
//! - Declarations are explicit data, checked once at build time
//! - Coercion is lossless or it fails
//! - All violations are collected; no partial records
//! - Deterministic violation order

mod coerce;
mod constraints;
mod errors;
mod loader;
mod types;
mod validator;
mod value;

pub use coerce::{json_type_name, parse_date, parse_datetime};
pub use constraints::{Constraint, FieldCheck, FieldCheckFn, Pattern, RecordCheck, RecordCheckFn};
pub use errors::{
    DeclarationError, DeclarationResult, ValidationError, Violation, ViolationKind,
};
pub use loader::DeclarationLoader;
pub use types::{
    ExtraPolicy, FieldDef, FieldType, RecordDeclaration, RecordDeclarationBuilder, TypeSpec,
};
pub use validator::{validate, SchemaValidator, ROOT_PATH};
pub use value::{TypedValue, ValidatedRecord};
