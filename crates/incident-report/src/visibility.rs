//! Conditional field visibility.
//!
//! Some fields only make sense once a sibling field has a particular value:
//! the "other" free-text fields appear when their choice is `"Other"`, and the
//! shift time appears when the person works shifts. The rules live in one
//! table, [`VISIBILITY_RULES`], which is evaluated against the current
//! document on every query and also drives the schema's conditional
//! requirements.

use serde_json::{json, Map, Value};

use crate::document::{ReportDocument, IMAGE_UPLOAD_PATH, SECTION_ADDITIONAL};

/// Widget name registered for the image upload field.
pub const FILE_UPLOAD_WIDGET: &str = "FileUploadWidget";
/// Widget name registered for the multi-select field.
pub const MULTI_SELECT_WIDGET: &str = "MultiSelectWidget";

/// Condition a controlling field must satisfy for its dependents to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The field holds exactly this string.
    Equals(&'static str),
    /// The field holds boolean `true`.
    IsTrue,
}

impl Condition {
    /// Whether `value` (absent when `None`) satisfies the condition.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Equals(expected), Some(Value::String(actual))) => actual == expected,
            (Self::IsTrue, Some(Value::Bool(flag))) => *flag,
            _ => false,
        }
    }

    /// The JSON constant the condition compares against.
    #[must_use]
    pub fn as_const(&self) -> Value {
        match self {
            Self::Equals(expected) => Value::String((*expected).to_string()),
            Self::IsTrue => Value::Bool(true),
        }
    }
}

/// Show `dependents` of `section` only while `field` satisfies `condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityRule {
    /// Section the fields belong to.
    pub section: &'static str,
    /// The controlling field.
    pub field: &'static str,
    /// Condition on the controlling field.
    pub condition: Condition,
    /// Fields shown (and required) while the condition holds.
    pub dependents: &'static [&'static str],
}

impl VisibilityRule {
    /// Whether the rule's condition holds for `document`.
    #[must_use]
    pub fn is_active(&self, document: &ReportDocument) -> bool {
        self.condition
            .matches(document.get(&format!("{}.{}", self.section, self.field)))
    }

    /// Dotted paths of the dependent fields.
    pub fn dependent_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.dependents
            .iter()
            .map(move |dependent| format!("{}.{}", self.section, dependent))
    }
}

/// Every conditional field in the report form.
pub const VISIBILITY_RULES: &[VisibilityRule] = &[
    VisibilityRule {
        section: "incidents",
        field: "incident_type",
        condition: Condition::Equals("Other"),
        dependents: &["other_incident_type"],
    },
    VisibilityRule {
        section: "incidents",
        field: "incident_category",
        condition: Condition::Equals("Other"),
        dependents: &["other_incident_category"],
    },
    VisibilityRule {
        section: "incidents",
        field: "nature_of_injury",
        condition: Condition::Equals("Other"),
        dependents: &["other_nature_of_injury"],
    },
    VisibilityRule {
        section: "incidents",
        field: "injured_body_part",
        condition: Condition::Equals("Other"),
        dependents: &["other_injured_body_part"],
    },
    VisibilityRule {
        section: "injuredPersons",
        field: "employment_type",
        condition: Condition::Equals("Other"),
        dependents: &["employment_type_other"],
    },
    VisibilityRule {
        section: "injuredPersons",
        field: "shift_schedule",
        condition: Condition::IsTrue,
        dependents: &["shift_schedule_time"],
    },
];

/// Rules whose fields live in `section`.
pub fn rules_for_section(section: &str) -> impl Iterator<Item = &'static VisibilityRule> + '_ {
    VISIBILITY_RULES
        .iter()
        .filter(move |rule| rule.section == section)
}

/// Whether the field at `path` is visible for `document`.
///
/// Fields not governed by any rule are always visible.
#[must_use]
pub fn is_visible(document: &ReportDocument, path: &str) -> bool {
    let mut governed = false;
    for rule in VISIBILITY_RULES {
        if rule.dependent_paths().any(|p| p == path) {
            governed = true;
            if rule.is_active(document) {
                return true;
            }
        }
    }
    !governed
}

/// Dotted paths of every conditional field currently hidden.
#[must_use]
pub fn hidden_fields(document: &ReportDocument) -> Vec<String> {
    VISIBILITY_RULES
        .iter()
        .filter(|rule| !rule.is_active(document))
        .flat_map(VisibilityRule::dependent_paths)
        .collect()
}

/// Dotted paths of every conditional field currently shown.
#[must_use]
pub fn visible_conditional_fields(document: &ReportDocument) -> Vec<String> {
    VISIBILITY_RULES
        .iter()
        .filter(|rule| rule.is_active(document))
        .flat_map(VisibilityRule::dependent_paths)
        .collect()
}

/// Build the renderer's UI schema for `document`.
///
/// Hidden conditional fields get `"ui:widget": "hidden"`; the upload and
/// multi-select fields are bound to their custom widgets.
#[must_use]
pub fn ui_schema(document: &ReportDocument) -> Value {
    let mut root = Map::new();

    for path in hidden_fields(document) {
        insert_widget(&mut root, &path, "hidden");
    }
    insert_widget(&mut root, IMAGE_UPLOAD_PATH, FILE_UPLOAD_WIDGET);
    insert_widget(
        &mut root,
        &format!("{SECTION_ADDITIONAL}.selectedOptions"),
        MULTI_SELECT_WIDGET,
    );

    Value::Object(root)
}

fn insert_widget(root: &mut Map<String, Value>, path: &str, widget: &str) {
    let mut current = root;
    for segment in path.split('.') {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert("ui:widget".to_string(), json!(widget));
}
