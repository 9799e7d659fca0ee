//! Declarative model of the report form schema.
//!
//! The form is described once, as data: sections, their fields, required
//! lists, enumerations and string constraints. From that description the
//! crate can emit a JSON-Schema document for an external renderer
//! ([`Schema::to_json_schema`]) and validate a [`ReportDocument`]
//! ([`SchemaValidator`]).
//!
//! Conditional requirements come from [`crate::visibility::VISIBILITY_RULES`],
//! so a field is required exactly when it is shown.
//!
//! [`ReportDocument`]: crate::document::ReportDocument

mod reporting;
mod validate;

use serde_json::{json, Map, Value};

use crate::visibility::{rules_for_section, VisibilityRule};

pub use reporting::reporting_form_schema;
pub use validate::{SchemaValidator, ValidationError};

/// String formats understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Time of day, `HH:MM` or `HH:MM:SS`.
    Time,
    /// A URI or an absolute path reference.
    Uri,
    /// A `data:` URL.
    DataUrl,
}

impl Format {
    /// The JSON-Schema name of the format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Uri => "uri",
            Self::DataUrl => "data-url",
        }
    }
}

/// The shape and constraints of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text.
    Text {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Expected string format.
        format: Option<Format>,
        /// Regular expression the value must match.
        pattern: Option<&'static str>,
    },
    /// One string out of a fixed list.
    Choice(&'static [&'static str]),
    /// Whole number.
    Integer {
        /// Inclusive lower bound.
        minimum: Option<i64>,
    },
    /// Any number.
    Number,
    /// True or false.
    Boolean,
    /// A nested object.
    Object(ObjectSpec),
    /// A list of values.
    Array {
        /// Shape of each item.
        items: Box<FieldKind>,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Whether items must be distinct.
        unique_items: bool,
    },
}

impl FieldKind {
    /// Plain text with an optional minimum length.
    #[must_use]
    pub fn text(min_length: Option<usize>) -> Self {
        Self::Text {
            min_length,
            format: None,
            pattern: None,
        }
    }

    /// Text in the given format.
    #[must_use]
    pub fn formatted(format: Format, min_length: Option<usize>) -> Self {
        Self::Text {
            min_length,
            format: Some(format),
            pattern: None,
        }
    }

    /// The enumerated options, if this is a choice or an array of choices.
    #[must_use]
    pub fn options(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Choice(options) => Some(*options),
            Self::Array { items, .. } => items.options(),
            _ => None,
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::Text {
                min_length,
                format,
                pattern,
            } => {
                let mut schema = Map::new();
                schema.insert("type".into(), json!("string"));
                if let Some(format) = format {
                    schema.insert("format".into(), json!(format.as_str()));
                }
                if let Some(min) = min_length {
                    schema.insert("minLength".into(), json!(min));
                }
                if let Some(pattern) = pattern {
                    schema.insert("pattern".into(), json!(pattern));
                }
                Value::Object(schema)
            }
            Self::Choice(options) => json!({"type": "string", "enum": options}),
            Self::Integer { minimum } => match minimum {
                Some(min) => json!({"type": "integer", "minimum": min}),
                None => json!({"type": "integer"}),
            },
            Self::Number => json!({"type": "number"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Object(spec) => spec.to_json_schema(),
            Self::Array {
                items,
                min_items,
                unique_items,
            } => {
                let mut schema = Map::new();
                schema.insert("type".into(), json!("array"));
                if let Some(min) = min_items {
                    schema.insert("minItems".into(), json!(min));
                }
                schema.insert("items".into(), items.to_json_schema());
                if *unique_items {
                    schema.insert("uniqueItems".into(), json!(true));
                }
                Value::Object(schema)
            }
        }
    }
}

/// A named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Property name in the document.
    pub name: &'static str,
    /// Human-readable label.
    pub title: Option<&'static str>,
    /// Shape and constraints.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Create a titled field.
    #[must_use]
    pub fn new(name: &'static str, title: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            title: Some(title),
            kind,
        }
    }

    /// Create a field without a title.
    #[must_use]
    pub fn untitled(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            title: None,
            kind,
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = self.kind.to_json_schema();
        if let (Some(title), Value::Object(map)) = (self.title, &mut schema) {
            map.insert("title".into(), json!(title));
        }
        schema
    }
}

/// An object with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    /// Property name (section name for top-level objects).
    pub name: &'static str,
    /// Human-readable label.
    pub title: Option<&'static str>,
    /// Fields that must be present.
    pub required: Vec<&'static str>,
    /// All fields, in display order.
    pub fields: Vec<FieldSpec>,
}

impl ObjectSpec {
    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The conditional rules attached to this object.
    pub fn rules(&self) -> impl Iterator<Item = &'static VisibilityRule> + '_ {
        rules_for_section(self.name)
    }

    fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.to_string(), field.to_json_schema()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        if let Some(title) = self.title {
            schema.insert("title".into(), json!(title));
        }
        if !self.required.is_empty() {
            schema.insert("required".into(), json!(self.required));
        }
        schema.insert("properties".into(), Value::Object(properties));

        let dependencies: Map<String, Value> = self
            .rules()
            .map(|rule| (rule.field.to_string(), self.dependency_schema(rule)))
            .collect();
        if !dependencies.is_empty() {
            schema.insert("dependencies".into(), Value::Object(dependencies));
        }

        Value::Object(schema)
    }

    fn dependency_schema(&self, rule: &VisibilityRule) -> Value {
        let mut active = Map::new();
        active.insert(rule.field.to_string(), json!({"const": rule.condition.as_const()}));
        for dependent in rule.dependents {
            if let Some(field) = self.field(dependent) {
                active.insert((*dependent).to_string(), field.kind.to_json_schema());
            }
        }

        json!({
            "oneOf": [
                {
                    "properties": active,
                    "required": rule.dependents,
                },
                {
                    "not": {
                        "properties": {
                            rule.field: {"const": rule.condition.as_const()}
                        }
                    },
                    "required": []
                }
            ]
        })
    }
}

/// The whole form: a titled object of sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Form title.
    pub title: &'static str,
    /// Sections that must be present.
    pub required: Vec<&'static str>,
    /// Sections in display order.
    pub sections: Vec<ObjectSpec>,
}

impl Schema {
    /// Look up a section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&ObjectSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Resolve a dotted path to its field definition.
    #[must_use]
    pub fn field_at(&self, path: &str) -> Option<&FieldSpec> {
        let mut segments = path.split('.');
        let mut object = self.section(segments.next()?)?;
        let mut field = object.field(segments.next()?)?;
        for segment in segments {
            let FieldKind::Object(spec) = &field.kind else {
                return None;
            };
            object = spec;
            field = object.field(segment)?;
        }
        Some(field)
    }

    /// Emit the JSON-Schema document consumed by form renderers.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .sections
            .iter()
            .map(|section| (section.name.to_string(), section.to_json_schema()))
            .collect();

        json!({
            "title": self.title,
            "type": "object",
            "required": self.required,
            "properties": properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_at_resolves_nested_paths() {
        let schema = reporting_form_schema();

        let field = schema.field_at("incidents.site_name").unwrap();
        assert_eq!(field.title, Some("Site Name"));

        let nested = schema
            .field_at("incidents.injured_diagram.marker_position")
            .unwrap();
        assert!(matches!(nested.kind, FieldKind::Object(_)));

        assert!(schema.field_at("incidents.site_name.deeper").is_none());
        assert!(schema.field_at("incidents").is_none());
        assert!(schema.field_at("nowhere.site_name").is_none());
    }

    #[test]
    fn test_options_for_multiselect() {
        let schema = reporting_form_schema();
        let field = schema.field_at("additional.selectedOptions").unwrap();
        assert_eq!(
            field.kind.options(),
            Some(&["Option A", "Option B", "Option C", "Option D"][..])
        );
    }

    #[test]
    fn test_json_schema_top_level() {
        let schema = reporting_form_schema().to_json_schema();

        assert_eq!(schema["title"], "Reporting Forms");
        assert_eq!(
            schema["required"],
            json!(["incidents", "injuredPersons", "medicalInfo", "witnessInfo"])
        );
        assert!(schema["properties"]["email"]["properties"]["email"]["pattern"].is_string());
    }

    #[test]
    fn test_json_schema_dependencies_for_incident_type() {
        let schema = reporting_form_schema().to_json_schema();
        let dependency = &schema["properties"]["incidents"]["dependencies"]["incident_type"];

        let active = &dependency["oneOf"][0];
        assert_eq!(active["properties"]["incident_type"]["const"], "Other");
        assert_eq!(active["properties"]["other_incident_type"]["minLength"], 1);
        assert_eq!(active["required"], json!(["other_incident_type"]));

        let inactive = &dependency["oneOf"][1];
        assert_eq!(inactive["not"]["properties"]["incident_type"]["const"], "Other");
        assert_eq!(inactive["required"], json!([]));
    }

    #[test]
    fn test_json_schema_shift_dependency_uses_boolean_const() {
        let schema = reporting_form_schema().to_json_schema();
        let dependency = &schema["properties"]["injuredPersons"]["dependencies"]["shift_schedule"];

        assert_eq!(dependency["oneOf"][0]["properties"]["shift_schedule"]["const"], true);
        assert_eq!(
            dependency["oneOf"][0]["properties"]["shift_schedule_time"]["enum"],
            json!(["day", "afternoon", "night"])
        );
    }

    #[test]
    fn test_json_schema_sections_without_rules_have_no_dependencies() {
        let schema = reporting_form_schema().to_json_schema();
        assert!(schema["properties"]["medicalInfo"].get("dependencies").is_none());
    }

    #[test]
    fn test_json_schema_array_field() {
        let schema = reporting_form_schema().to_json_schema();
        let upload = &schema["properties"]["incidents"]["properties"]["image_upload"];
        assert_eq!(upload["type"], "array");
        assert_eq!(upload["items"]["format"], "data-url");
        assert_eq!(upload["title"], "Incident Image Upload");
    }
}
