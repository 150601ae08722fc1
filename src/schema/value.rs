//! Typed values produced by validation

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

/// A value that has been coerced to its declared type.
///
/// Enum fields produce `String` values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Explicit null on a nullable field
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Date(NaiveDate),
    /// Datetime without an offset
    DateTime(NaiveDateTime),
    /// Datetime carrying an explicit offset
    DateTimeTz(DateTime<FixedOffset>),
    Record(ValidatedRecord),
    List(Vec<TypedValue>),
}

impl TypedValue {
    /// Returns the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Int(_) => "int",
            TypedValue::Float(_) => "float",
            TypedValue::Bool(_) => "bool",
            TypedValue::String(_) => "string",
            TypedValue::Date(_) => "date",
            TypedValue::DateTime(_) | TypedValue::DateTimeTz(_) => "datetime",
            TypedValue::Record(_) => "record",
            TypedValue::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a number, for ints and floats
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Int(i) => Some(*i as f64),
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            TypedValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the datetime in its own wall-clock time
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            TypedValue::DateTime(dt) => Some(*dt),
            TypedValue::DateTimeTz(dt) => Some(dt.naive_local()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ValidatedRecord> {
        match self {
            TypedValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Calendar year, for dates and datetimes
    pub(crate) fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        match self {
            TypedValue::Date(d) => Some(d.year()),
            TypedValue::DateTime(dt) => Some(dt.year()),
            TypedValue::DateTimeTz(dt) => Some(dt.year()),
            _ => None,
        }
    }

    /// Re-serializes into the input mapping shape.
    ///
    /// Dates render as `YYYY-MM-DD`, datetimes as ISO 8601.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Int(i) => Value::from(*i),
            TypedValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            TypedValue::DateTime(dt) => {
                Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            TypedValue::DateTimeTz(dt) => Value::String(dt.to_rfc3339()),
            TypedValue::Record(r) => r.to_json(),
            TypedValue::List(items) => Value::Array(items.iter().map(TypedValue::to_json).collect()),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// A record whose every field conforms to its declaration.
///
/// Fields appear in declaration order. Only constructed by the validator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedRecord {
    fields: Vec<(String, TypedValue)>,
    /// Present only under the `allow-and-report` policy
    extra: Option<Map<String, Value>>,
}

impl ValidatedRecord {
    pub(crate) fn insert(&mut self, name: &str, value: TypedValue) {
        self.fields.push((name.to_string(), value));
    }

    pub(crate) fn set_extra(&mut self, extra: Map<String, Value>) {
        self.extra = Some(extra);
    }

    /// Gets a field value by name
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Checks if a field is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of fields present
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the extra fields bag
    pub fn extra(&self) -> Option<&Map<String, Value>> {
        self.extra.as_ref()
    }

    /// Returns the undeclared keys found in the input (schema drift)
    pub fn extra_keys(&self) -> Vec<&str> {
        self.extra
            .as_ref()
            .map(|bag| bag.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Re-serializes into the input mapping shape, extra fields included
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.to_json());
        }
        if let Some(extra) = &self.extra {
            for (key, value) in extra {
                if !obj.contains_key(key) {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(obj)
    }

    /// Deserializes the record into a caller-defined type
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_json())
    }
}
