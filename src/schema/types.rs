//! Declaration types
//!
//! Supported field types:
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - string: UTF-8 string
//! - date / datetime: ISO 8601
//! - enum: string from a fixed literal set (case-sensitive)
//! - record: nested record with its own declaration
//! - list: ordered sequence with a single element type
//!
//! Declarations are built once, checked for structural errors, and
//! immutable afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::constraints::{Constraint, FieldCheck, RecordCheck};
use super::errors::{DeclarationError, DeclarationResult};
use super::validator::Pass;
use crate::config::CoercionMode;

/// Declared semantic type of a field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    Bool,
    String,
    Date,
    DateTime,
    /// String restricted to a literal set
    Enum {
        values: Vec<String>,
    },
    /// Nested record
    Record {
        declaration: RecordDeclaration,
    },
    /// Homogeneous sequence
    List {
        /// Element type (boxed to allow recursive types)
        element: Box<TypeSpec>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Enum { .. } => "enum",
            FieldType::Record { .. } => "record",
            FieldType::List { .. } => "list",
        }
    }

    /// Returns the expected-type text used in type errors
    pub fn describe(&self) -> String {
        match self {
            FieldType::Date => "date (YYYY-MM-DD)".into(),
            FieldType::DateTime => "datetime (ISO 8601)".into(),
            FieldType::Enum { values } => format!("one of [{}]", values.join(", ")),
            FieldType::Record { declaration } => format!("record '{}'", declaration.name()),
            FieldType::List { element } => format!("list of {}", element.kind().type_name()),
            other => other.type_name().into(),
        }
    }
}

/// A type together with the constraints and checks on its values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    #[serde(flatten)]
    kind: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
    #[serde(skip)]
    checks: Vec<FieldCheck>,
}

impl TypeSpec {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            constraints: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn bool() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn datetime() -> Self {
        Self::new(FieldType::DateTime)
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn record(declaration: RecordDeclaration) -> Self {
        Self::new(FieldType::Record { declaration })
    }

    pub fn list(element: TypeSpec) -> Self {
        Self::new(FieldType::List {
            element: Box::new(element),
        })
    }

    /// Adds a built-in constraint
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn min(self, min: f64) -> Self {
        self.constraint(Constraint::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.constraint(Constraint::Max(max))
    }

    pub fn positive(self) -> Self {
        self.constraint(Constraint::Positive)
    }

    pub fn non_negative(self) -> Self {
        self.constraint(Constraint::NonNegative)
    }

    pub fn min_year(self, year: i32) -> Self {
        self.constraint(Constraint::MinYear(year))
    }

    pub fn min_length(self, len: usize) -> Self {
        self.constraint(Constraint::MinLength(len))
    }

    pub fn max_length(self, len: usize) -> Self {
        self.constraint(Constraint::MaxLength(len))
    }

    /// Adds a custom check
    pub fn check(mut self, check: FieldCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn kind(&self) -> &FieldType {
        &self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn checks(&self) -> &[FieldCheck] {
        &self.checks
    }

    /// Validates the type structure, `path` naming it in errors
    fn validate_structure(&self, path: &str) -> DeclarationResult<()> {
        match &self.kind {
            FieldType::Enum { values } if values.is_empty() => {
                return Err(DeclarationError::EmptyEnum(path.to_string()));
            }
            FieldType::Record { declaration } => declaration.validate_structure()?,
            FieldType::List { element } => element.validate_structure(&format!("{}[]", path))?,
            _ => {}
        }

        for constraint in &self.constraints {
            if !constraint.applies_to(&self.kind) {
                return Err(DeclarationError::InapplicableConstraint {
                    field: path.to_string(),
                    constraint: constraint.name().to_string(),
                    type_name: self.kind.type_name().to_string(),
                });
            }
        }

        self.check_bounds(path)
    }

    /// Rejects constraint combinations no value can satisfy
    fn check_bounds(&self, path: &str) -> DeclarationResult<()> {
        let mut lower: Option<(f64, bool)> = None;
        let mut upper: Option<f64> = None;
        let mut min_len: Option<usize> = None;
        let mut max_len: Option<usize> = None;

        for constraint in &self.constraints {
            match constraint {
                Constraint::Min(min) => lower = tighter_lower(lower, (*min, false)),
                Constraint::Positive => lower = tighter_lower(lower, (0.0, true)),
                Constraint::NonNegative => lower = tighter_lower(lower, (0.0, false)),
                Constraint::Max(max) => upper = Some(upper.map_or(*max, |u| u.min(*max))),
                Constraint::MinLength(len) => min_len = Some(min_len.map_or(*len, |m| m.max(*len))),
                Constraint::MaxLength(len) => max_len = Some(max_len.map_or(*len, |m| m.min(*len))),
                Constraint::MinYear(_) | Constraint::Pattern(_) => {}
            }
        }

        if let (Some((low, exclusive)), Some(high)) = (lower, upper) {
            if low > high || (exclusive && low >= high) {
                return Err(DeclarationError::ConflictingConstraints {
                    field: path.to_string(),
                    reason: format!(
                        "lower bound {}{} exceeds upper bound {}",
                        if exclusive { "> " } else { ">= " },
                        low,
                        high
                    ),
                });
            }
        }

        if let (Some(low), Some(high)) = (min_len, max_len) {
            if low > high {
                return Err(DeclarationError::ConflictingConstraints {
                    field: path.to_string(),
                    reason: format!("min_length {} exceeds max_length {}", low, high),
                });
            }
        }

        Ok(())
    }
}

/// Keeps the stricter of two lower bounds; `bool` marks an exclusive bound
fn tighter_lower(current: Option<(f64, bool)>, candidate: (f64, bool)) -> Option<(f64, bool)> {
    match current {
        None => Some(candidate),
        Some((value, exclusive)) => {
            if candidate.0 > value || (candidate.0 == value && candidate.1 && !exclusive) {
                Some(candidate)
            } else {
                Some((value, exclusive))
            }
        }
    }
}

/// Field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    name: String,
    #[serde(flatten)]
    spec: TypeSpec,
    /// Whether field must be present
    #[serde(default = "default_required")]
    required: bool,
    /// Whether an explicit null is accepted
    #[serde(default)]
    nullable: bool,
    /// Value used when the field is absent; a `null` default makes the field nullable
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    default: Option<Value>,
}

fn default_required() -> bool {
    true
}

/// Distinguishes `"default": null` from an absent key
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FieldDef {
    /// Create a required field
    pub fn required(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            required: true,
            nullable: false,
            default: None,
        }
    }

    /// Create an optional field with no default
    pub fn optional(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            required: false,
            ..Self::required(name, spec)
        }
    }

    /// Accept an explicit null (`T | None`)
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set a default; the field becomes optional
    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &TypeSpec {
        &self.spec
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Null is accepted when nullable or when the default is null
    pub fn accepts_null(&self) -> bool {
        self.nullable || matches!(self.default, Some(Value::Null))
    }

    fn validate_structure(&self, record: &str) -> DeclarationResult<()> {
        let path = format!("{}.{}", record, self.name);
        self.spec.validate_structure(&path)?;

        if self.required && self.default.is_some() {
            return Err(DeclarationError::RequiredWithDefault(path));
        }

        if let Some(default) = self.default.as_ref().filter(|d| !d.is_null()) {
            let mut pass = Pass::new(CoercionMode::Lax);
            if pass.field(self, default, &self.name).is_none() {
                return Err(DeclarationError::InvalidDefault {
                    field: path,
                    expected: self.spec.kind.describe(),
                });
            }
        }

        Ok(())
    }
}

/// Policy for input keys that no field declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPolicy {
    /// Each unknown key is a violation
    #[default]
    Reject,
    /// Unknown keys are kept verbatim in the extra fields bag
    AllowAndReport,
    /// Unknown keys are dropped
    Ignore,
}

/// Complete record declaration
///
/// Deserializing runs the same structural checks as `build()`, nested
/// declarations included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UncheckedDeclaration")]
pub struct RecordDeclaration {
    /// Declaration name (e.g., "player")
    name: String,
    /// Unknown-key policy
    extra: ExtraPolicy,
    /// Field declarations in order
    fields: Vec<FieldDef>,
    /// Cross-field checks, run after all fields
    #[serde(skip)]
    checks: Vec<RecordCheck>,
}

/// Declaration as read from JSON, before structural checks
#[derive(Deserialize)]
struct UncheckedDeclaration {
    name: String,
    #[serde(default)]
    extra: ExtraPolicy,
    fields: Vec<FieldDef>,
}

impl TryFrom<UncheckedDeclaration> for RecordDeclaration {
    type Error = DeclarationError;

    fn try_from(raw: UncheckedDeclaration) -> DeclarationResult<Self> {
        let declaration = RecordDeclaration {
            name: raw.name,
            extra: raw.extra,
            fields: raw.fields,
            checks: Vec::new(),
        };
        declaration.validate_structure()?;
        Ok(declaration)
    }
}

impl RecordDeclaration {
    /// Start building a declaration
    pub fn builder(name: impl Into<String>) -> RecordDeclarationBuilder {
        RecordDeclarationBuilder {
            name: name.into(),
            extra: ExtraPolicy::default(),
            fields: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extra_policy(&self) -> ExtraPolicy {
        self.extra
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Gets a field declaration by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn checks(&self) -> &[RecordCheck] {
        &self.checks
    }

    /// Validates the declaration structure itself (not a record)
    pub fn validate_structure(&self) -> DeclarationResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DeclarationError::DuplicateField {
                    record: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            field.validate_structure(&self.name)?;
        }

        for check in &self.checks {
            let referenced = check.reads().iter().map(String::as_str).chain(check.report_field());
            for field in referenced {
                if !self.has_field(field) {
                    return Err(DeclarationError::UnknownCheckField {
                        check: check.name().to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Builder for `RecordDeclaration`
#[derive(Debug)]
pub struct RecordDeclarationBuilder {
    name: String,
    extra: ExtraPolicy,
    fields: Vec<FieldDef>,
    checks: Vec<RecordCheck>,
}

impl RecordDeclarationBuilder {
    /// Set the unknown-key policy
    pub fn extra(mut self, policy: ExtraPolicy) -> Self {
        self.extra = policy;
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn check(mut self, check: RecordCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Finish the declaration, rejecting malformed structure
    pub fn build(self) -> DeclarationResult<RecordDeclaration> {
        let declaration = RecordDeclaration {
            name: self.name,
            extra: self.extra,
            fields: self.fields,
            checks: self.checks,
        };
        declaration.validate_structure()?;
        Ok(declaration)
    }
}
