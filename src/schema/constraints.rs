//! Constraints and custom checks attached to declared types
//!
//! Built-in constraints are plain data and serialize with the declaration.
//! Custom checks are function values; they live only in memory and are
//! skipped when a declaration is saved.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::{DeclarationError, DeclarationResult};
use super::types::FieldType;
use super::value::{TypedValue, ValidatedRecord};

/// Compiled regular expression that serializes as its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> DeclarationResult<Self> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|e| DeclarationError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Built-in constraint on a coerced value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// Numeric lower bound (inclusive)
    Min(f64),
    /// Numeric upper bound (inclusive)
    Max(f64),
    /// Strictly greater than zero
    Positive,
    /// Greater than or equal to zero
    NonNegative,
    /// Earliest calendar year for dates and datetimes
    MinYear(i32),
    /// Minimum length of a string (in chars) or list
    MinLength(usize),
    /// Maximum length of a string (in chars) or list
    MaxLength(usize),
    /// Regular expression a string must match
    Pattern(Pattern),
}

impl Constraint {
    /// Builds a pattern constraint, compiling the expression
    pub fn pattern(pattern: &str) -> DeclarationResult<Self> {
        Pattern::new(pattern).map(Constraint::Pattern)
    }

    /// Returns the constraint name used in violations
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::Positive => "positive",
            Constraint::NonNegative => "non_negative",
            Constraint::MinYear(_) => "min_year",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Pattern(_) => "pattern",
        }
    }

    /// Returns the bound as reported in violations
    pub fn describe(&self) -> String {
        match self {
            Constraint::Min(min) => format!(">= {}", min),
            Constraint::Max(max) => format!("<= {}", max),
            Constraint::Positive => "> 0".into(),
            Constraint::NonNegative => ">= 0".into(),
            Constraint::MinYear(year) => format!("year >= {}", year),
            Constraint::MinLength(len) => format!("length >= {}", len),
            Constraint::MaxLength(len) => format!("length <= {}", len),
            Constraint::Pattern(p) => format!("matches /{}/", p.as_str()),
        }
    }

    /// Checks whether the constraint can be evaluated on a type
    pub fn applies_to(&self, field_type: &FieldType) -> bool {
        match self {
            Constraint::Min(_) | Constraint::Max(_) | Constraint::Positive | Constraint::NonNegative => {
                matches!(field_type, FieldType::Int | FieldType::Float)
            }
            Constraint::MinYear(_) => matches!(field_type, FieldType::Date | FieldType::DateTime),
            Constraint::MinLength(_) | Constraint::MaxLength(_) => {
                matches!(field_type, FieldType::String | FieldType::List { .. })
            }
            Constraint::Pattern(_) => {
                matches!(field_type, FieldType::String | FieldType::Enum { .. })
            }
        }
    }

    /// Evaluates the constraint, returning the failure message.
    ///
    /// Values of a type the constraint does not apply to pass.
    pub fn evaluate(&self, value: &TypedValue) -> Result<(), String> {
        let holds = match self {
            Constraint::Min(min) => value.as_number().map_or(true, |n| n >= *min),
            Constraint::Max(max) => value.as_number().map_or(true, |n| n <= *max),
            Constraint::Positive => value.as_number().map_or(true, |n| n > 0.0),
            Constraint::NonNegative => value.as_number().map_or(true, |n| n >= 0.0),
            Constraint::MinYear(year) => value.year().map_or(true, |y| y >= *year),
            Constraint::MinLength(len) => length_of(value).map_or(true, |l| l >= *len),
            Constraint::MaxLength(len) => length_of(value).map_or(true, |l| l <= *len),
            Constraint::Pattern(p) => value.as_str().map_or(true, |s| p.is_match(s)),
        };

        if holds {
            return Ok(());
        }

        Err(match self {
            Constraint::Min(min) => format!("must be greater than or equal to {}", min),
            Constraint::Max(max) => format!("must be less than or equal to {}", max),
            Constraint::Positive => "must be greater than 0".into(),
            Constraint::NonNegative => "must be greater than or equal to 0".into(),
            Constraint::MinYear(year) => format!("years prior to {} not allowed", year),
            Constraint::MinLength(len) => format!("length must be at least {}", len),
            Constraint::MaxLength(len) => format!("length must be at most {}", len),
            Constraint::Pattern(p) => format!("must match pattern '{}'", p.as_str()),
        })
    }
}

fn length_of(value: &TypedValue) -> Option<usize> {
    match value {
        TypedValue::String(s) => Some(s.chars().count()),
        TypedValue::List(items) => Some(items.len()),
        _ => None,
    }
}

/// Signature of a custom single-value check
pub type FieldCheckFn = dyn Fn(&TypedValue) -> Result<(), String> + Send + Sync;

/// Signature of a custom cross-field check
pub type RecordCheckFn = dyn Fn(&ValidatedRecord) -> Result<(), String> + Send + Sync;

/// Caller-supplied check on one coerced value.
///
/// Runs after built-in constraints. Must be free of side effects.
#[derive(Clone)]
pub struct FieldCheck {
    name: String,
    func: Arc<FieldCheckFn>,
}

impl FieldCheck {
    /// Create a check that returns its own failure message
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&TypedValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Create a check from a boolean predicate and a fixed message
    pub fn predicate<F>(name: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TypedValue) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        Self::new(name, move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err(message.clone())
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, value: &TypedValue) -> Result<(), String> {
        (self.func)(value)
    }
}

impl fmt::Debug for FieldCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCheck").field("name", &self.name).finish()
    }
}

/// Caller-supplied check across fields of one record.
///
/// Receives the partially assembled record. Runs only when every field
/// it reads validated cleanly; a check reading nothing runs only when
/// the whole record did.
#[derive(Clone)]
pub struct RecordCheck {
    name: String,
    reads: Vec<String>,
    report_at: Option<String>,
    func: Arc<RecordCheckFn>,
}

impl RecordCheck {
    pub fn new<I, S, F>(name: impl Into<String>, reads: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&ValidatedRecord) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            reads: reads.into_iter().map(Into::into).collect(),
            report_at: None,
            func: Arc::new(func),
        }
    }

    /// Report failures at a field path instead of the record path
    pub fn report_at(mut self, field: impl Into<String>) -> Self {
        self.report_at = Some(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields the check reads
    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    pub fn report_field(&self) -> Option<&str> {
        self.report_at.as_deref()
    }

    pub fn run(&self, record: &ValidatedRecord) -> Result<(), String> {
        (self.func)(record)
    }
}

impl fmt::Debug for RecordCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCheck")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("report_at", &self.report_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_min_bound() {
        let c = Constraint::Min(1949.0);
        assert!(c.evaluate(&TypedValue::Int(1997)).is_ok());
        assert!(c.evaluate(&TypedValue::Int(1949)).is_ok());
        let msg = c.evaluate(&TypedValue::Int(1920)).unwrap_err();
        assert!(msg.contains("1949"));
        assert_eq!(c.describe(), ">= 1949");
    }

    #[test]
    fn test_positive_and_non_negative() {
        assert!(Constraint::Positive.evaluate(&TypedValue::Int(0)).is_err());
        assert!(Constraint::Positive.evaluate(&TypedValue::Int(1)).is_ok());
        assert!(Constraint::NonNegative.evaluate(&TypedValue::Float(0.0)).is_ok());
        assert!(Constraint::NonNegative.evaluate(&TypedValue::Float(-0.1)).is_err());
    }

    #[test]
    fn test_min_year() {
        let c = Constraint::MinYear(1900);
        let ok = TypedValue::Date(NaiveDate::from_ymd_opt(1976, 4, 25).unwrap());
        let early = TypedValue::Date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap());
        assert!(c.evaluate(&ok).is_ok());
        assert!(c.evaluate(&early).is_err());
    }

    #[test]
    fn test_lengths() {
        let list = TypedValue::List(vec![TypedValue::Int(1), TypedValue::Int(2)]);
        assert!(Constraint::MinLength(1).evaluate(&list).is_ok());
        assert!(Constraint::MaxLength(1).evaluate(&list).is_err());
        assert!(Constraint::MaxLength(3).evaluate(&TypedValue::String("abcd".into())).is_err());
    }

    #[test]
    fn test_pattern() {
        let c = Constraint::pattern("^[A-Z]").unwrap();
        assert!(c.evaluate(&TypedValue::String("Spurs".into())).is_ok());
        assert!(c.evaluate(&TypedValue::String("spurs".into())).is_err());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = Constraint::pattern("([a-z").unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_applicability() {
        assert!(Constraint::Min(0.0).applies_to(&FieldType::Int));
        assert!(Constraint::Min(0.0).applies_to(&FieldType::Float));
        assert!(!Constraint::Min(0.0).applies_to(&FieldType::String));
        assert!(Constraint::MinYear(1900).applies_to(&FieldType::Date));
        assert!(!Constraint::MinYear(1900).applies_to(&FieldType::Int));
    }

    #[test]
    fn test_constraint_serde_shape() {
        let json = serde_json::to_value(Constraint::Min(1949.0)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "min", "value": 1949.0}));

        let parsed: Constraint = serde_json::from_value(serde_json::json!({"kind": "positive"})).unwrap();
        assert!(matches!(parsed, Constraint::Positive));

        let parsed: Constraint =
            serde_json::from_value(serde_json::json!({"kind": "pattern", "value": "^[A-Z]"})).unwrap();
        assert_eq!(parsed.describe(), "matches /^[A-Z]/");
    }

    #[test]
    fn test_field_check_predicate() {
        let check = FieldCheck::predicate("even", "must be even", |v| {
            v.as_int().map_or(false, |i| i % 2 == 0)
        });
        assert_eq!(check.name(), "even");
        assert!(check.run(&TypedValue::Int(4)).is_ok());
        assert_eq!(check.run(&TypedValue::Int(3)).unwrap_err(), "must be even");
    }

    #[test]
    fn test_record_check_reads() {
        let check = RecordCheck::new("dob_before_update", ["dob", "last_updated"], |_| Ok(()))
            .report_at("dob");
        assert_eq!(check.reads(), ["dob".to_string(), "last_updated".to_string()]);
        assert_eq!(check.report_field(), Some("dob"));
    }
}
