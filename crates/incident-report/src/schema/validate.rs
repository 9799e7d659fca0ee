//! Validation of a report document against the form schema.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use super::{FieldKind, Format, ObjectSpec, Schema};
use crate::document::{kind_of, ReportDocument, SECTION_MEDICAL_INFO};

/// Medical date pairs that must not run backwards: `(start, end, message)`.
const DATE_RANGES: &[(&str, &str, &str)] = &[
    (
        "med_cert_start_date",
        "med_cert_end_date",
        "Medical cert start date cannot be after end date.",
    ),
    (
        "ward_admitted_start_date",
        "ward_admitted_end_date",
        "Ward admitted start date cannot be after end date.",
    ),
];

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending value; empty for the document root.
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validates documents against a [`Schema`].
#[derive(Debug)]
pub struct SchemaValidator {
    schema: Schema,
    patterns: HashMap<&'static str, Regex>,
}

impl SchemaValidator {
    /// Compile the schema's patterns and build a validator.
    ///
    /// Patterns that fail to compile are logged and skipped.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        let mut patterns = HashMap::new();
        for section in &schema.sections {
            collect_patterns(section, &mut patterns);
        }
        Self { schema, patterns }
    }

    /// The schema this validator checks against.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate `document`, returning every violation found.
    #[must_use]
    pub fn validate(&self, document: &ReportDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let root = document.as_map();

        for required in &self.schema.required {
            if !root.contains_key(*required) {
                errors.push(ValidationError::new(*required, "is required"));
            }
        }

        for section in &self.schema.sections {
            match root.get(section.name) {
                None => {}
                Some(Value::Object(map)) => {
                    self.check_object(section, map, section.name, &mut errors);
                }
                Some(other) => errors.push(type_error(section.name, "object", other)),
            }
        }

        check_date_ranges(document, &mut errors);

        trace!("Validation found {} error(s)", errors.len());
        errors
    }

    fn check_object(
        &self,
        spec: &ObjectSpec,
        map: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        for required in &spec.required {
            if !map.contains_key(*required) {
                errors.push(ValidationError::new(
                    format!("{path}.{required}"),
                    "is required",
                ));
            }
        }

        for field in &spec.fields {
            if let Some(value) = map.get(field.name) {
                self.check_value(&field.kind, value, &format!("{path}.{}", field.name), errors);
            }
        }

        for rule in spec.rules() {
            if !rule.condition.matches(map.get(rule.field)) {
                continue;
            }
            for dependent in rule.dependents {
                if !map.contains_key(*dependent) {
                    errors.push(ValidationError::new(
                        format!("{path}.{dependent}"),
                        format!("is required when {} is {}", rule.field, rule.condition.as_const()),
                    ));
                }
            }
        }
    }

    fn check_value(
        &self,
        kind: &FieldKind,
        value: &Value,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        match kind {
            FieldKind::Text {
                min_length,
                format,
                pattern,
            } => {
                let Some(text) = value.as_str() else {
                    errors.push(type_error(path, "string", value));
                    return;
                };
                if let Some(min) = min_length {
                    if text.chars().count() < *min {
                        errors.push(ValidationError::new(
                            path,
                            format!("must not have fewer than {min} characters"),
                        ));
                    }
                }
                if let Some(format) = format {
                    if !text.is_empty() && !matches_format(*format, text) {
                        errors.push(ValidationError::new(
                            path,
                            format!("must match format \"{}\"", format.as_str()),
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    if let Some(regex) = self.patterns.get(pattern) {
                        if !regex.is_match(text) {
                            errors.push(ValidationError::new(
                                path,
                                format!("must match pattern \"{pattern}\""),
                            ));
                        }
                    }
                }
            }
            FieldKind::Choice(options) => match value.as_str() {
                Some(choice) if options.contains(&choice) => {}
                Some(_) => errors.push(ValidationError::new(
                    path,
                    "must be equal to one of the allowed values",
                )),
                None => errors.push(type_error(path, "string", value)),
            },
            FieldKind::Integer { minimum } => {
                let Some(number) = as_integer(value) else {
                    errors.push(type_error(path, "integer", value));
                    return;
                };
                if let Some(min) = minimum {
                    if number < *min {
                        errors.push(ValidationError::new(path, format!("must be >= {min}")));
                    }
                }
            }
            FieldKind::Number => {
                if !value.is_number() {
                    errors.push(type_error(path, "number", value));
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    errors.push(type_error(path, "boolean", value));
                }
            }
            FieldKind::Object(spec) => match value {
                Value::Object(map) => self.check_object(spec, map, path, errors),
                other => errors.push(type_error(path, "object", other)),
            },
            FieldKind::Array {
                items,
                min_items,
                unique_items,
            } => {
                let Some(list) = value.as_array() else {
                    errors.push(type_error(path, "array", value));
                    return;
                };
                if let Some(min) = min_items {
                    if list.len() < *min {
                        errors.push(ValidationError::new(
                            path,
                            format!("must not have fewer than {min} items"),
                        ));
                    }
                }
                if *unique_items && has_duplicates(list) {
                    errors.push(ValidationError::new(
                        path,
                        "must not have duplicate items",
                    ));
                }
                for (index, item) in list.iter().enumerate() {
                    self.check_value(items, item, &format!("{path}[{index}]"), errors);
                }
            }
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(super::reporting_form_schema())
    }
}

fn collect_patterns(spec: &ObjectSpec, patterns: &mut HashMap<&'static str, Regex>) {
    for field in &spec.fields {
        collect_kind_patterns(&field.kind, patterns);
    }
}

fn collect_kind_patterns(kind: &FieldKind, patterns: &mut HashMap<&'static str, Regex>) {
    match kind {
        FieldKind::Text {
            pattern: Some(pattern),
            ..
        } => match Regex::new(pattern) {
            Ok(regex) => {
                patterns.insert(*pattern, regex);
            }
            Err(e) => warn!(pattern = %pattern, error = %e, "Invalid schema pattern"),
        },
        FieldKind::Object(spec) => collect_patterns(spec, patterns),
        FieldKind::Array { items, .. } => collect_kind_patterns(items, patterns),
        _ => {}
    }
}

fn type_error(path: &str, expected: &str, found: &Value) -> ValidationError {
    ValidationError::new(
        path,
        format!("must be {expected}, found {}", kind_of(found)),
    )
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn has_duplicates(list: &[Value]) -> bool {
    list.iter()
        .enumerate()
        .any(|(i, item)| list[i + 1..].contains(item))
}

fn matches_format(format: Format, text: &str) -> bool {
    match format {
        Format::Date => parse_full_date(text).is_some(),
        Format::Time => is_partial_time(text),
        Format::Uri => is_uri_reference(text),
        Format::DataUrl => text
            .strip_prefix("data:")
            .is_some_and(|rest| rest.contains(',')),
    }
}

/// An absolute URI (`scheme:...`) or an absolute path such as `/human.jpg`.
fn is_uri_reference(text: &str) -> bool {
    if text.starts_with('/') {
        return !text.contains(char::is_whitespace);
    }
    let Some((scheme, rest)) = text.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !text.contains(char::is_whitespace)
}

/// Two ASCII digits per field joined by `sep`, as in RFC 3339.
fn has_digit_shape(text: &str, widths: &[usize], sep: u8) -> bool {
    let bytes = text.as_bytes();
    let expected = widths.iter().sum::<usize>() + widths.len() - 1;
    if bytes.len() != expected {
        return false;
    }
    let mut at = 0;
    for (index, width) in widths.iter().enumerate() {
        if index > 0 {
            if bytes[at] != sep {
                return false;
            }
            at += 1;
        }
        if !bytes[at..at + width].iter().all(u8::is_ascii_digit) {
            return false;
        }
        at += width;
    }
    true
}

/// `YYYY-MM-DD` with a real calendar date.
fn parse_full_date(text: &str) -> Option<NaiveDate> {
    if !has_digit_shape(text, &[4, 2, 2], b'-') {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// `HH:MM` or `HH:MM:SS`.
fn is_partial_time(text: &str) -> bool {
    if has_digit_shape(text, &[2, 2, 2], b':') {
        NaiveTime::parse_from_str(text, "%H:%M:%S").is_ok()
    } else if has_digit_shape(text, &[2, 2], b':') {
        NaiveTime::parse_from_str(text, "%H:%M").is_ok()
    } else {
        false
    }
}

fn check_date_ranges(document: &ReportDocument, errors: &mut Vec<ValidationError>) {
    for (start, end, message) in DATE_RANGES {
        let start_date = parse_date(document, start);
        let end_date = parse_date(document, end);
        if let (Some(start_date), Some(end_date)) = (start_date, end_date) {
            if start_date > end_date {
                errors.push(ValidationError::new(
                    format!("{SECTION_MEDICAL_INFO}.{start}"),
                    *message,
                ));
            }
        }
    }
}

fn parse_date(document: &ReportDocument, field: &str) -> Option<NaiveDate> {
    let text = document.get_str(&format!("{SECTION_MEDICAL_INFO}.{field}"))?;
    parse_full_date(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::default()
    }

    fn doc(value: Value) -> ReportDocument {
        ReportDocument::from_value(value).unwrap()
    }

    fn complete_report() -> Value {
        json!({
            "incidents": {
                "business_unit": "Construction",
                "site_name": "North Yard",
                "date_of_incident": "2024-03-04",
                "time_of_incident": "14:30:00",
                "location": "Loading dock",
                "description": "Slipped on wet floor",
                "incident_type": "Health & Safety",
                "incident_category": "First aid",
                "nature_of_injury": "Bruise",
                "injured_body_part": "Leg",
                "injured_diagram": {
                    "image_url": "/human.jpg",
                    "marker_position": {"x": 120, "y": 300}
                }
            },
            "injuredPersons": {
                "name": "A. Worker",
                "designation": "Rigger",
                "department": "Operations",
                "age": 34,
                "immediate_supervisor": "B. Lead",
                "employment_type": "Contractor",
                "period_work_in_sunway": "1-3 years",
                "employment_start_date": "2021-06-01",
                "engaged_in_performing_task_related_to_incident": "Yes",
                "period_task_related_to_incident": "<6months",
                "shift_schedule": false
            },
            "medicalInfo": {
                "hospital": "General",
                "med_cert_start_date": "2024-03-04",
                "med_cert_end_date": "2024-03-06",
                "med_cert_days": 3,
                "ward_admitted_start_date": "2024-03-04",
                "ward_admitted_end_date": "2024-03-04",
                "ward_admitted_days": 0
            },
            "witnessInfo": {
                "name": "C. Witness",
                "designation": "Foreman",
                "witness_statement": "Saw the fall."
            },
            "email": {"email": "reporter@example.com"}
        })
    }

    fn paths(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_complete_report_is_valid() {
        let errors = validator().validate(&doc(complete_report()));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn test_empty_document_reports_required_sections() {
        let errors = validator().validate(&ReportDocument::new());
        assert_eq!(
            paths(&errors),
            vec!["incidents", "injuredPersons", "medicalInfo", "witnessInfo"]
        );
    }

    #[test]
    fn test_missing_required_field() {
        let mut report = complete_report();
        report["witnessInfo"]
            .as_object_mut()
            .unwrap()
            .remove("witness_statement");

        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["witnessInfo.witness_statement"]);
        assert_eq!(errors[0].to_string(), "witnessInfo.witness_statement: is required");
    }

    #[test]
    fn test_enum_membership() {
        let mut report = complete_report();
        report["incidents"]["incident_type"] = json!("Volcano");

        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["incidents.incident_type"]);
        assert!(errors[0].message.contains("allowed values"));
    }

    #[test]
    fn test_other_requires_free_text() {
        let mut report = complete_report();
        report["incidents"]["incident_type"] = json!("Other");

        let errors = validator().validate(&doc(report.clone()));
        assert_eq!(paths(&errors), vec!["incidents.other_incident_type"]);

        report["incidents"]["other_incident_type"] = json!("");
        let errors = validator().validate(&doc(report.clone()));
        assert!(errors[0].message.contains("fewer than 1"));

        report["incidents"]["other_incident_type"] = json!("Flooding");
        assert!(validator().validate(&doc(report)).is_empty());
    }

    #[test]
    fn test_shift_schedule_requires_time() {
        let mut report = complete_report();
        report["injuredPersons"]["shift_schedule"] = json!(true);

        let errors = validator().validate(&doc(report.clone()));
        assert_eq!(paths(&errors), vec!["injuredPersons.shift_schedule_time"]);
        assert!(errors[0].message.contains("shift_schedule is true"));

        report["injuredPersons"]["shift_schedule_time"] = json!("dusk");
        let errors = validator().validate(&doc(report.clone()));
        assert!(errors[0].message.contains("allowed values"));

        report["injuredPersons"]["shift_schedule_time"] = json!("night");
        assert!(validator().validate(&doc(report)).is_empty());
    }

    #[test]
    fn test_integer_minimum_and_type() {
        let mut report = complete_report();
        report["injuredPersons"]["age"] = json!(-1);
        report["medicalInfo"]["med_cert_days"] = json!(2.5);

        let errors = validator().validate(&doc(report));
        assert_eq!(
            paths(&errors),
            vec!["injuredPersons.age", "medicalInfo.med_cert_days"]
        );
        assert_eq!(errors[0].message, "must be >= 0");
        assert!(errors[1].message.contains("must be integer"));
    }

    #[test]
    fn test_formats() {
        let mut report = complete_report();
        report["incidents"]["date_of_incident"] = json!("04/03/2024");
        report["incidents"]["time_of_incident"] = json!("25:00");
        report["incidents"]["injured_diagram"]["image_url"] = json!("not a uri");
        report["incidents"]["image_upload"] = json!(["data:image/png;base64,AA==", "plain"]);

        let errors = validator().validate(&doc(report));
        assert_eq!(
            paths(&errors),
            vec![
                "incidents.date_of_incident",
                "incidents.time_of_incident",
                "incidents.injured_diagram.image_url",
                "incidents.image_upload[1]",
            ]
        );
    }

    #[test]
    fn test_time_without_seconds_is_accepted() {
        let mut report = complete_report();
        report["incidents"]["time_of_incident"] = json!("09:15");
        assert!(validator().validate(&doc(report)).is_empty());
    }

    #[test]
    fn test_date_and_time_need_two_digit_fields() {
        assert!(matches_format(Format::Date, "2024-03-04"));
        assert!(!matches_format(Format::Date, "2024-3-4"));
        assert!(!matches_format(Format::Date, "+2024-03-04"));
        assert!(!matches_format(Format::Date, "2024-02-30"));
        assert!(!matches_format(Format::Date, "２０２４-03-04"));

        assert!(matches_format(Format::Time, "09:05"));
        assert!(matches_format(Format::Time, "23:59:59"));
        assert!(!matches_format(Format::Time, "9:5"));
        assert!(!matches_format(Format::Time, "09:05:7"));
        assert!(!matches_format(Format::Time, "09-05"));
    }

    #[test]
    fn test_loose_dates_are_not_compared() {
        let mut report = complete_report();
        report["medicalInfo"]["med_cert_start_date"] = json!("2024-3-10");

        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["medicalInfo.med_cert_start_date"]);
        assert!(errors[0].message.contains("format"));
    }

    #[test]
    fn test_marker_position_requires_coordinates() {
        let mut report = complete_report();
        report["incidents"]["injured_diagram"]["marker_position"] = json!({"x": 10});

        let errors = validator().validate(&doc(report));
        assert_eq!(
            paths(&errors),
            vec!["incidents.injured_diagram.marker_position.y"]
        );
    }

    #[test]
    fn test_email_pattern() {
        let mut report = complete_report();
        report["email"]["email"] = json!("nobody");

        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["email.email"]);
        assert!(errors[0].message.contains("pattern"));
    }

    #[test]
    fn test_selected_options_rules() {
        let mut report = complete_report();
        report["additional"] = json!({"selectedOptions": []});
        let errors = validator().validate(&doc(report.clone()));
        assert!(errors[0].message.contains("fewer than 1 items"));

        report["additional"] = json!({"selectedOptions": ["Option A", "Option A"]});
        let errors = validator().validate(&doc(report.clone()));
        assert!(errors[0].message.contains("duplicate"));

        report["additional"] = json!({"selectedOptions": ["Option Z"]});
        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["additional.selectedOptions[0]"]);
    }

    #[test]
    fn test_section_type_mismatch() {
        let mut report = complete_report();
        report["witnessInfo"] = json!("nobody saw");

        let errors = validator().validate(&doc(report));
        assert_eq!(paths(&errors), vec!["witnessInfo"]);
        assert_eq!(errors[0].message, "must be object, found string");
    }

    #[test]
    fn test_date_ranges_must_not_run_backwards() {
        let mut report = complete_report();
        report["medicalInfo"]["med_cert_start_date"] = json!("2024-03-10");
        report["medicalInfo"]["ward_admitted_end_date"] = json!("2024-03-01");

        let errors = validator().validate(&doc(report));
        assert_eq!(
            errors,
            vec![
                ValidationError::new(
                    "medicalInfo.med_cert_start_date",
                    "Medical cert start date cannot be after end date."
                ),
                ValidationError::new(
                    "medicalInfo.ward_admitted_start_date",
                    "Ward admitted start date cannot be after end date."
                ),
            ]
        );
    }

    #[test]
    fn test_uri_reference() {
        assert!(is_uri_reference("/human.jpg"));
        assert!(is_uri_reference("https://example.com/human.jpg"));
        assert!(!is_uri_reference("human.jpg"));
        assert!(!is_uri_reference("1http://x"));
        assert!(!is_uri_reference("https:"));
    }

    #[test]
    fn test_root_error_display() {
        let err = ValidationError::new("", "must be object");
        assert_eq!(err.to_string(), "must be object");
    }
}
