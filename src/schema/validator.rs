//! Record validator
//!
//! Validation semantics:
//! - Required fields must be present; optional fields fall back to their default
//! - Values are coerced losslessly to the declared type
//! - Constraints and custom checks run only on successfully coerced values
//! - Record checks run only when every field they read validated cleanly
//! - Undeclared keys follow the declaration's extra policy
//!
//! Every violation is collected before failing. A field stops at its first
//! failing stage (presence, then type) so one bad value never produces
//! follow-on noise. No partially valid record is ever returned.

use serde_json::{Map, Value};

use super::coerce::{coerce_scalar, json_type_name};
use super::errors::{ValidationError, Violation};
use super::types::{ExtraPolicy, FieldDef, FieldType, RecordDeclaration, TypeSpec};
use super::value::{TypedValue, ValidatedRecord};
use crate::config::{CoercionMode, ValidatorConfig};
use crate::observability::{Event, Logger, MetricsRegistry, Severity};

/// Path used for violations on the root value itself
pub const ROOT_PATH: &str = "$root";

/// Validates input records against declarations.
///
/// Holds no per-call state: declarations are borrowed, every call builds
/// its own result. Safe to share across threads.
#[derive(Debug, Default)]
pub struct SchemaValidator {
    config: ValidatorConfig,
    metrics: MetricsRegistry,
}

impl SchemaValidator {
    /// Creates a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            metrics: MetricsRegistry::new(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Returns the validation counters.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Validates an input record against a declaration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` carrying every violation found if any
    /// field is missing, mistyped, violates a constraint, or if an
    /// undeclared key is present under the `reject` policy.
    pub fn validate(
        &self,
        declaration: &RecordDeclaration,
        input: &Value,
    ) -> Result<ValidatedRecord, ValidationError> {
        let mut pass = Pass::new(self.config.coercion);
        let record = pass.record(declaration, input, "");
        let violations = pass.into_violations();

        self.metrics.increment_records_validated();

        match record {
            Some(record) if violations.is_empty() => {
                self.report_extra(declaration, &record);
                self.log(
                    Severity::Trace,
                    Event::RecordValidated,
                    &[("record", declaration.name())],
                );
                Ok(record)
            }
            _ => {
                self.metrics.increment_records_rejected();
                self.metrics.add_violations(violations.len() as u64);
                let count = violations.len().to_string();
                let first = violations.first().map(|v| v.path.as_str()).unwrap_or(ROOT_PATH);
                self.log(
                    Severity::Warn,
                    Event::RecordRejected,
                    &[
                        ("record", declaration.name()),
                        ("violations", count.as_str()),
                        ("first_path", first),
                    ],
                );
                Err(ValidationError::new(declaration.name(), violations))
            }
        }
    }

    /// Logs and counts undeclared keys kept under `allow-and-report`.
    fn report_extra(&self, declaration: &RecordDeclaration, record: &ValidatedRecord) {
        for key in record.extra_keys() {
            self.metrics.increment_extra_fields();
            self.log(
                Severity::Info,
                Event::ExtraFieldDetected,
                &[("field", key), ("record", declaration.name())],
            );
        }
    }

    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if self.config.should_log(severity) {
            Logger::log(severity, event.as_str(), fields);
        }
    }
}

/// Validates a record with the default configuration.
///
/// Lax coercion, no logging: the call performs no I/O.
pub fn validate(
    declaration: &RecordDeclaration,
    input: &Value,
) -> Result<ValidatedRecord, ValidationError> {
    SchemaValidator::default().validate(declaration, input)
}

/// One validation walk, collecting violations in order.
pub(crate) struct Pass {
    mode: CoercionMode,
    violations: Vec<Violation>,
}

impl Pass {
    pub(crate) fn new(mode: CoercionMode) -> Self {
        Self {
            mode,
            violations: Vec::new(),
        }
    }

    pub(crate) fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Validates a record value; `None` if any violation was recorded for it.
    pub(crate) fn record(
        &mut self,
        declaration: &RecordDeclaration,
        raw: &Value,
        path: &str,
    ) -> Option<ValidatedRecord> {
        let here = if path.is_empty() { ROOT_PATH } else { path };

        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => {
                self.violations.push(Violation::type_mismatch(
                    here,
                    format!("record '{}'", declaration.name()),
                    json_type_name(raw),
                ));
                return None;
            }
        };

        let start = self.violations.len();
        let mut record = ValidatedRecord::default();

        for field in declaration.fields() {
            let field_path = make_path(path, field.name());

            let value = match obj.get(field.name()) {
                Some(value) => self.field(field, value, &field_path),
                None if field.is_required() => {
                    self.violations.push(Violation::missing(&field_path));
                    None
                }
                None => self.default_value(field, &field_path),
            };

            if let Some(value) = value {
                record.insert(field.name(), value);
            }
        }

        let fields_clean = self.violations.len() == start;

        for check in declaration.checks() {
            let ready = if check.reads().is_empty() {
                fields_clean
            } else {
                check.reads().iter().all(|f| record.contains(f))
            };
            if !ready {
                continue;
            }

            if let Err(message) = check.run(&record) {
                let check_path = match check.report_field() {
                    Some(field) => make_path(path, field),
                    None => here.to_string(),
                };
                self.violations
                    .push(Violation::check_failed(check_path, check.name(), None, message));
            }
        }

        self.unknown_keys(declaration, obj, path, &mut record);

        (self.violations.len() == start).then_some(record)
    }

    fn unknown_keys(
        &mut self,
        declaration: &RecordDeclaration,
        obj: &Map<String, Value>,
        path: &str,
        record: &mut ValidatedRecord,
    ) {
        let unknown = obj.iter().filter(|(key, _)| !declaration.has_field(key));

        match declaration.extra_policy() {
            ExtraPolicy::Reject => {
                for (key, _) in unknown {
                    self.violations.push(Violation::unknown_field(make_path(path, key)));
                }
            }
            ExtraPolicy::AllowAndReport => {
                let bag: Map<String, Value> =
                    unknown.map(|(key, value)| (key.clone(), value.clone())).collect();
                record.set_extra(bag);
            }
            ExtraPolicy::Ignore => {}
        }
    }

    /// Validates one present field value, null handling included.
    pub(crate) fn field(&mut self, field: &FieldDef, raw: &Value, path: &str) -> Option<TypedValue> {
        if raw.is_null() {
            if field.accepts_null() {
                return Some(TypedValue::Null);
            }
            self.violations.push(Violation::type_mismatch(
                path,
                field.spec().kind().describe(),
                "null",
            ));
            return None;
        }

        self.value(field.spec(), raw, path)
    }

    /// Defaults are always coerced leniently; they were checked at declaration time.
    fn default_value(&mut self, field: &FieldDef, path: &str) -> Option<TypedValue> {
        let default = field.default_value()?;
        let mode = std::mem::replace(&mut self.mode, CoercionMode::Lax);
        let value = self.field(field, default, path);
        self.mode = mode;
        value
    }

    /// Coerces a value to a type spec, then runs its constraints and checks.
    fn value(&mut self, spec: &TypeSpec, raw: &Value, path: &str) -> Option<TypedValue> {
        let start = self.violations.len();

        let typed = match spec.kind() {
            FieldType::Record { declaration } => TypedValue::Record(self.record(declaration, raw, path)?),
            FieldType::List { element } => TypedValue::List(self.list(spec, element, raw, path)?),
            kind => match coerce_scalar(kind, raw, self.mode) {
                Some(typed) => typed,
                None => {
                    self.violations.push(Violation::type_mismatch(
                        path,
                        kind.describe(),
                        json_type_name(raw),
                    ));
                    return None;
                }
            },
        };

        for constraint in spec.constraints() {
            if let Err(message) = constraint.evaluate(&typed) {
                self.violations.push(Violation::constraint(
                    path,
                    constraint.name(),
                    constraint.describe(),
                    typed.to_string(),
                    message,
                ));
            }
        }

        for check in spec.checks() {
            if let Err(message) = check.run(&typed) {
                self.violations.push(Violation::check_failed(
                    path,
                    check.name(),
                    Some(typed.to_string()),
                    message,
                ));
            }
        }

        (self.violations.len() == start).then_some(typed)
    }

    /// Validates every element; each failing index reports on its own.
    fn list(
        &mut self,
        spec: &TypeSpec,
        element: &TypeSpec,
        raw: &Value,
        path: &str,
    ) -> Option<Vec<TypedValue>> {
        let items = match raw.as_array() {
            Some(items) => items,
            None => {
                self.violations.push(Violation::type_mismatch(
                    path,
                    spec.kind().describe(),
                    json_type_name(raw),
                ));
                return None;
            }
        };

        let start = self.violations.len();
        let mut out = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", path, i);

            if item.is_null() {
                self.violations.push(Violation::type_mismatch(
                    &item_path,
                    element.kind().describe(),
                    "null",
                ));
                continue;
            }

            if let Some(typed) = self.value(element, item, &item_path) {
                out.push(typed);
            }
        }

        (self.violations.len() == start).then_some(out)
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::constraints::{FieldCheck, RecordCheck};
    use super::super::errors::ViolationKind;
    use serde_json::json;

    fn quiet() -> SchemaValidator {
        SchemaValidator::new(ValidatorConfig::quiet())
    }

    fn draft_decl() -> RecordDeclaration {
        RecordDeclaration::builder("player")
            .field(FieldDef::required("draft_year", TypeSpec::int().min(1949.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_record_passes() {
        let record = quiet().validate(&draft_decl(), &json!({"draft_year": 1997})).unwrap();
        assert_eq!(record.get("draft_year"), Some(&TypedValue::Int(1997)));
    }

    #[test]
    fn test_bound_violation() {
        let err = quiet().validate(&draft_decl(), &json!({"draft_year": 1920})).unwrap_err();
        assert_eq!(err.len(), 1);
        let v = &err.violations()[0];
        assert_eq!(v.path, "draft_year");
        assert_eq!(v.kind, ViolationKind::ConstraintViolation);
        assert_eq!(v.constraint.as_deref(), Some("min"));
        assert_eq!(v.expected.as_deref(), Some(">= 1949"));
        assert_eq!(v.actual.as_deref(), Some("1920"));
    }

    #[test]
    fn test_missing_field_only_reported_once() {
        let err = quiet().validate(&draft_decl(), &json!({})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations()[0].kind, ViolationKind::Missing);
        assert_eq!(err.violations()[0].path, "draft_year");
    }

    #[test]
    fn test_type_error_skips_constraints() {
        let err = quiet().validate(&draft_decl(), &json!({"draft_year": "19.5"})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations()[0].kind, ViolationKind::TypeError);
        assert_eq!(err.violations()[0].expected.as_deref(), Some("int"));
        assert_eq!(err.violations()[0].actual.as_deref(), Some("string"));
    }

    #[test]
    fn test_root_must_be_object() {
        let err = quiet().validate(&draft_decl(), &json!([1, 2])).unwrap_err();
        assert_eq!(err.paths(), vec![ROOT_PATH]);
        assert_eq!(err.violations()[0].actual.as_deref(), Some("array"));
    }

    #[test]
    fn test_strict_mode_rejects_string_numbers() {
        let strict = SchemaValidator::new(ValidatorConfig::strict().with_log_level(None));
        let err = strict.validate(&draft_decl(), &json!({"draft_year": "1997"})).unwrap_err();
        assert_eq!(err.violations()[0].kind, ViolationKind::TypeError);

        let record = quiet().validate(&draft_decl(), &json!({"draft_year": "1997"})).unwrap();
        assert_eq!(record.get("draft_year"), Some(&TypedValue::Int(1997)));
    }

    #[test]
    fn test_all_constraints_and_checks_reported() {
        let decl = RecordDeclaration::builder("team")
            .field(FieldDef::required(
                "name",
                TypeSpec::string()
                    .min_length(20)
                    .check(FieldCheck::predicate("capitalized", "must be capitalized", |v| {
                        v.as_str().map_or(false, |s| s.starts_with(char::is_uppercase))
                    })),
            ))
            .build()
            .unwrap();

        let err = quiet().validate(&decl, &json!({"name": "spurs"})).unwrap_err();
        let names: Vec<_> = err
            .violations()
            .iter()
            .map(|v| v.constraint.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["min_length", "capitalized"]);
    }

    #[test]
    fn test_null_handling() {
        let decl = RecordDeclaration::builder("player")
            .field(FieldDef::required("last_updated", TypeSpec::datetime()).nullable())
            .field(FieldDef::required("name", TypeSpec::string()))
            .build()
            .unwrap();

        let record = quiet()
            .validate(&decl, &json!({"last_updated": null, "name": "Tim"}))
            .unwrap();
        assert_eq!(record.get("last_updated"), Some(&TypedValue::Null));

        let err = quiet()
            .validate(&decl, &json!({"last_updated": null, "name": null}))
            .unwrap_err();
        assert_eq!(err.paths(), vec!["name"]);
        assert_eq!(err.violations()[0].actual.as_deref(), Some("null"));
    }

    #[test]
    fn test_optional_default_inserted() {
        let decl = RecordDeclaration::builder("player")
            .field(FieldDef::optional("dob", TypeSpec::date()).with_default(Value::Null))
            .field(FieldDef::optional("is_active", TypeSpec::bool()).with_default(json!(true)))
            .field(FieldDef::optional("nickname", TypeSpec::string()))
            .build()
            .unwrap();

        let record = quiet().validate(&decl, &json!({})).unwrap();
        assert_eq!(record.get("dob"), Some(&TypedValue::Null));
        assert_eq!(record.get("is_active"), Some(&TypedValue::Bool(true)));
        assert!(!record.contains("nickname"));
    }

    #[test]
    fn test_unknown_field_policies() {
        let build = |policy| {
            RecordDeclaration::builder("player")
                .extra(policy)
                .field(FieldDef::required("id", TypeSpec::int()))
                .build()
                .unwrap()
        };
        let input = json!({"id": 1, "height": "6'11\"", "weight": 250});

        let err = quiet().validate(&build(ExtraPolicy::Reject), &input).unwrap_err();
        assert_eq!(err.paths(), vec!["height", "weight"]);
        assert!(err.violations().iter().all(|v| v.kind == ViolationKind::UnknownField));

        let record = quiet().validate(&build(ExtraPolicy::AllowAndReport), &input).unwrap();
        assert_eq!(record.extra_keys(), vec!["height", "weight"]);
        assert_eq!(record.extra().unwrap()["weight"], json!(250));

        let record = quiet().validate(&build(ExtraPolicy::Ignore), &input).unwrap();
        assert!(record.extra().is_none());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_list_elements_reported_independently() {
        let decl = RecordDeclaration::builder("team")
            .field(FieldDef::required(
                "championships",
                TypeSpec::list(TypeSpec::int().min(1949.0)),
            ))
            .build()
            .unwrap();

        let err = quiet()
            .validate(&decl, &json!({"championships": [1999, "x", 1920, null, 2014]}))
            .unwrap_err();
        assert_eq!(
            err.paths(),
            vec!["championships[1]", "championships[2]", "championships[3]"]
        );
        assert_eq!(err.violations()[0].kind, ViolationKind::TypeError);
        assert_eq!(err.violations()[1].kind, ViolationKind::ConstraintViolation);
        assert_eq!(err.violations()[2].kind, ViolationKind::TypeError);
    }

    #[test]
    fn test_list_level_constraint_after_elements() {
        let decl = RecordDeclaration::builder("player")
            .field(FieldDef::required(
                "positions",
                TypeSpec::list(TypeSpec::enumeration(["C", "F", "G"])).min_length(1),
            ))
            .build()
            .unwrap();

        let err = quiet().validate(&decl, &json!({"positions": []})).unwrap_err();
        assert_eq!(err.violations()[0].constraint.as_deref(), Some("min_length"));

        let err = quiet().validate(&decl, &json!({"positions": "F"})).unwrap_err();
        assert_eq!(err.violations()[0].expected.as_deref(), Some("list of enum"));
    }

    #[test]
    fn test_record_check_skipped_when_read_field_fails() {
        let decl = RecordDeclaration::builder("span")
            .field(FieldDef::required("start", TypeSpec::int()))
            .field(FieldDef::required("end", TypeSpec::int()))
            .check(RecordCheck::new("ordered", ["start", "end"], |r| {
                let start = r.get("start").and_then(TypedValue::as_int);
                let end = r.get("end").and_then(TypedValue::as_int);
                if start <= end {
                    Ok(())
                } else {
                    Err("start must not exceed end".into())
                }
            }))
            .build()
            .unwrap();

        let err = quiet().validate(&decl, &json!({"start": 5, "end": 1})).unwrap_err();
        assert_eq!(err.paths(), vec![ROOT_PATH]);
        assert_eq!(err.violations()[0].constraint.as_deref(), Some("ordered"));

        let err = quiet().validate(&decl, &json!({"start": 5, "end": "soon"})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations()[0].kind, ViolationKind::TypeError);
    }

    fn whole_record_check_decl() -> RecordDeclaration {
        RecordDeclaration::builder("stats")
            .field(FieldDef::required("ppg", TypeSpec::float().non_negative()))
            .field(FieldDef::required("games", TypeSpec::int()))
            .check(RecordCheck::new("games_played", ["games"], |r| {
                match r.get("games").and_then(TypedValue::as_int) {
                    Some(games) if games > 0 => Ok(()),
                    _ => Err("no games played".into()),
                }
            }))
            .check(RecordCheck::new("whole", Vec::<String>::new(), |r| {
                match r.get("ppg").and_then(TypedValue::as_float) {
                    Some(ppg) if ppg < 100.0 => Ok(()),
                    _ => Err("implausible scoring".into()),
                }
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_readless_check_runs_on_clean_record() {
        let decl = whole_record_check_decl();

        let err = quiet()
            .validate(&decl, &json!({"ppg": 150.0, "games": 10}))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations()[0].path, ROOT_PATH);
        assert_eq!(err.violations()[0].constraint.as_deref(), Some("whole"));

        quiet().validate(&decl, &json!({"ppg": 19.0, "games": 10})).unwrap();
    }

    #[test]
    fn test_readless_check_skipped_after_field_error() {
        let decl = whole_record_check_decl();

        let err = quiet()
            .validate(&decl, &json!({"ppg": 150.0, "games": "many"}))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations()[0].path, "games");
        assert_eq!(err.violations()[0].kind, ViolationKind::TypeError);
    }

    #[test]
    fn test_readless_check_unaffected_by_other_check_failure() {
        let decl = whole_record_check_decl();

        let err = quiet()
            .validate(&decl, &json!({"ppg": 150.0, "games": 0}))
            .unwrap_err();
        let names: Vec<_> = err
            .violations()
            .iter()
            .map(|v| v.constraint.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["games_played", "whole"]);
    }

    #[test]
    fn test_nested_unknown_key_paths() {
        let team = |policy| {
            RecordDeclaration::builder("teams")
                .extra(policy)
                .field(FieldDef::required("name", TypeSpec::string()))
                .build()
                .unwrap()
        };
        let player = |policy| {
            RecordDeclaration::builder("player")
                .field(FieldDef::required("teams", TypeSpec::list(TypeSpec::record(team(policy)))))
                .build()
                .unwrap()
        };
        let input = json!({"teams": [{"name": "Spurs"}, {"name": "Spurs", "height": 211}]});

        let err = quiet().validate(&player(ExtraPolicy::Reject), &input).unwrap_err();
        assert_eq!(err.paths(), vec!["teams[1].height"]);
        assert_eq!(err.violations()[0].kind, ViolationKind::UnknownField);

        let record = quiet().validate(&player(ExtraPolicy::AllowAndReport), &input).unwrap();
        assert!(record.extra().map_or(true, |bag| bag.is_empty()));
        let teams = record.get("teams").and_then(TypedValue::as_list).unwrap();
        assert!(teams[0].as_record().unwrap().extra_keys().is_empty());
        let second = teams[1].as_record().unwrap();
        assert_eq!(second.extra_keys(), vec!["height"]);
        assert_eq!(second.extra().unwrap()["height"], json!(211));
    }

    #[test]
    fn test_record_check_report_at_field() {
        let decl = RecordDeclaration::builder("span")
            .field(FieldDef::required("start", TypeSpec::int()))
            .check(RecordCheck::new("never", ["start"], |_| Err("nope".into())).report_at("start"))
            .build()
            .unwrap();

        let err = quiet().validate(&decl, &json!({"start": 1})).unwrap_err();
        assert_eq!(err.paths(), vec!["start"]);
    }

    #[test]
    fn test_metrics_counted() {
        let validator = quiet();
        let decl = RecordDeclaration::builder("player")
            .extra(ExtraPolicy::AllowAndReport)
            .field(FieldDef::required("id", TypeSpec::int().positive()))
            .build()
            .unwrap();

        validator.validate(&decl, &json!({"id": 1, "height": 211})).unwrap();
        validator.validate(&decl, &json!({"id": 0})).unwrap_err();
        validator.validate(&decl, &json!({})).unwrap_err();

        let snapshot = validator.metrics().snapshot();
        assert_eq!(snapshot.records_validated, 3);
        assert_eq!(snapshot.records_rejected, 2);
        assert_eq!(snapshot.violations, 2);
        assert_eq!(snapshot.extra_fields_detected, 1);
    }

    #[test]
    fn test_default_validator_is_silent() {
        let validator = SchemaValidator::default();
        assert_eq!(validator.config().log_level, None);
        assert!(!validator.config().should_log(Severity::Fatal));

        let err = validate(&draft_decl(), &json!({})).unwrap_err();
        assert_eq!(err.paths(), vec!["draft_year"]);
    }

    #[test]
    fn test_make_path() {
        assert_eq!(make_path("", "name"), "name");
        assert_eq!(make_path("teams[0]", "name"), "teams[0].name");
    }
}
