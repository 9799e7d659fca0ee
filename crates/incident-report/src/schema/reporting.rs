//! The incident reporting form.

use super::{FieldKind, FieldSpec, Format, ObjectSpec, Schema};
use crate::document::{
    SECTION_ADDITIONAL, SECTION_EMAIL, SECTION_INCIDENTS, SECTION_INJURED_PERSONS,
    SECTION_MEDICAL_INFO, SECTION_WITNESS_INFO,
};

const INCIDENT_TYPES: &[&str] = &[
    "Health & Safety",
    "Environment",
    "Equipment & Infrastructure",
    "Security",
    "Other",
];

const INCIDENT_CATEGORIES: &[&str] = &[
    "First aid",
    "Near Miss",
    "Dangerous Occurrence",
    "Environmental Incident",
    "Fatal",
    "Security Impact",
    "Occupational Illness",
    "Other",
    "Lost Time Injury (Bodily Injury – Schedule 1)",
    "Lost Time Injury (Other than Bodily Injury – Schedule 1)",
];

// Spellings are part of the stored data; keep them as-is.
const INJURY_NATURES: &[&str] = &[
    "Sprain/Strain",
    "Fracture",
    "Unconciousness",
    "Bruise",
    "Cut/Leceration",
    "Electric Shock",
    "Dislocation",
    "Other",
    "Burns",
    "Crushing",
    "Amputation",
];

const BODY_PARTS: &[&str] = &[
    "Head", "Face", "Neck", "Arm", "Foot", "Toe", "Eye", "Leg", "Hand", "Other", "Finger",
];

const EMPLOYMENT_TYPES: &[&str] = &["Sunway", "Client", "Contractor", "Other"];

// Shared by both tenure questions.
const TENURE_PERIODS: &[&str] = &["<6months", "<6months - 1 year", "1-3 years", ">3 years"];

const SHIFT_TIMES: &[&str] = &["day", "afternoon", "night"];

const DISABILITY_TYPES: &[&str] = &["Permanent Disability", "Non-Permanent Disability"];

const ADDITIONAL_OPTIONS: &[&str] = &["Option A", "Option B", "Option C", "Option D"];

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn required_text(name: &'static str, title: &'static str) -> FieldSpec {
    FieldSpec::new(name, title, FieldKind::text(Some(1)))
}

fn date(name: &'static str, title: &'static str) -> FieldSpec {
    FieldSpec::new(name, title, FieldKind::formatted(Format::Date, None))
}

fn count(name: &'static str, title: &'static str) -> FieldSpec {
    FieldSpec::new(name, title, FieldKind::Integer { minimum: Some(0) })
}

/// Build the reporting form schema.
#[must_use]
pub fn reporting_form_schema() -> Schema {
    Schema {
        title: "Reporting Forms",
        required: vec![
            SECTION_INCIDENTS,
            SECTION_INJURED_PERSONS,
            SECTION_MEDICAL_INFO,
            SECTION_WITNESS_INFO,
        ],
        sections: vec![
            incidents(),
            injured_persons(),
            medical_info(),
            witness_info(),
            additional(),
            email(),
        ],
    }
}

fn incidents() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_INCIDENTS,
        title: None,
        required: vec![
            "business_unit",
            "site_name",
            "date_of_incident",
            "time_of_incident",
            "location",
            "description",
            "incident_type",
            "incident_category",
            "nature_of_injury",
            "injured_body_part",
            "injured_diagram",
        ],
        fields: vec![
            required_text("business_unit", "Business Unit"),
            required_text("site_name", "Site Name"),
            FieldSpec::new(
                "date_of_incident",
                "Date of Incident",
                FieldKind::formatted(Format::Date, Some(1)),
            ),
            FieldSpec::new(
                "time_of_incident",
                "Time of Incident",
                FieldKind::formatted(Format::Time, Some(1)),
            ),
            required_text("location", "Location of Incident"),
            required_text("description", "Description of Incident"),
            FieldSpec::new(
                "incident_type",
                "Incident Type",
                FieldKind::Choice(INCIDENT_TYPES),
            ),
            required_text("other_incident_type", "Other Incident Type"),
            FieldSpec::new(
                "incident_category",
                "Incident Category",
                FieldKind::Choice(INCIDENT_CATEGORIES),
            ),
            required_text("other_incident_category", "Other Incident Category"),
            FieldSpec::new(
                "nature_of_injury",
                "Nature of Injury",
                FieldKind::Choice(INJURY_NATURES),
            ),
            required_text("other_nature_of_injury", "Other Nature of Injury"),
            FieldSpec::new(
                "injured_body_part",
                "Injured Body Part",
                FieldKind::Choice(BODY_PARTS),
            ),
            required_text("other_injured_body_part", "Other Injured Body Part"),
            FieldSpec::new(
                "injured_diagram",
                "Injured Diagram",
                FieldKind::Object(ObjectSpec {
                    name: "injured_diagram",
                    title: Some("Injured Diagram"),
                    required: vec!["image_url", "marker_position"],
                    fields: vec![
                        FieldSpec::new(
                            "image_url",
                            "Image URL",
                            FieldKind::formatted(Format::Uri, Some(1)),
                        ),
                        FieldSpec::new(
                            "marker_position",
                            "Marker Position",
                            FieldKind::Object(ObjectSpec {
                                name: "marker_position",
                                title: Some("Marker Position"),
                                required: vec!["x", "y"],
                                fields: vec![
                                    FieldSpec::untitled("x", FieldKind::Number),
                                    FieldSpec::untitled("y", FieldKind::Number),
                                ],
                            }),
                        ),
                    ],
                }),
            ),
            FieldSpec::new(
                "image_upload",
                "Incident Image Upload",
                FieldKind::Array {
                    items: Box::new(FieldKind::formatted(Format::DataUrl, None)),
                    min_items: None,
                    unique_items: false,
                },
            ),
        ],
    }
}

fn injured_persons() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_INJURED_PERSONS,
        title: Some("Injured Persons Information"),
        required: vec![
            "name",
            "designation",
            "department",
            "age",
            "immediate_supervisor",
            "employment_type",
            "period_work_in_sunway",
            "employment_start_date",
            "engaged_in_performing_task_related_to_incident",
            "period_task_related_to_incident",
            "shift_schedule",
        ],
        fields: vec![
            required_text("name", "Name of Injured Person"),
            required_text("designation", "Designation of Injured Person"),
            required_text("department", "Department of Injured Person"),
            count("age", "Age of Injured Person"),
            required_text("immediate_supervisor", "Immediate Supervisor"),
            FieldSpec::new(
                "employment_type",
                "Employment Type",
                FieldKind::Choice(EMPLOYMENT_TYPES),
            ),
            FieldSpec::untitled("employment_type_other", FieldKind::text(Some(1))),
            FieldSpec::new(
                "period_work_in_sunway",
                "Period of Work in Sunway",
                FieldKind::Choice(TENURE_PERIODS),
            ),
            date("employment_start_date", "Employment Start Date"),
            required_text(
                "engaged_in_performing_task_related_to_incident",
                "Engaged in Performing Task Related to Incident",
            ),
            FieldSpec::new(
                "period_task_related_to_incident",
                "Period of Task Related to Incident",
                FieldKind::Choice(TENURE_PERIODS),
            ),
            FieldSpec::new("shift_schedule", "Shift Schedule", FieldKind::Boolean),
            FieldSpec::new(
                "shift_schedule_time",
                "Shift Schedule Time",
                FieldKind::Choice(SHIFT_TIMES),
            ),
        ],
    }
}

fn medical_info() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_MEDICAL_INFO,
        title: Some("Medical Information"),
        required: vec![
            "hospital",
            "med_cert_start_date",
            "med_cert_end_date",
            "med_cert_days",
            "ward_admitted_start_date",
            "ward_admitted_end_date",
            "ward_admitted_days",
        ],
        fields: vec![
            required_text("hospital", "Hospital Name"),
            date("med_cert_start_date", "Medical Certificate Start Date"),
            date("med_cert_end_date", "Medical Certificate End Date"),
            count("med_cert_days", "Medical Certificate Days"),
            date("ward_admitted_start_date", "Ward Admitted Start Date"),
            date("ward_admitted_end_date", "Ward Admitted End Date"),
            count("ward_admitted_days", "Ward Admitted Days"),
            FieldSpec::new(
                "disability",
                "Disability Type",
                FieldKind::Choice(DISABILITY_TYPES),
            ),
        ],
    }
}

fn witness_info() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_WITNESS_INFO,
        title: Some("Witness Information"),
        required: vec!["name", "designation", "witness_statement"],
        fields: vec![
            required_text("name", "Witness Name"),
            required_text("designation", "Witness Designation"),
            required_text("witness_statement", "Witness Statement"),
        ],
    }
}

fn additional() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_ADDITIONAL,
        title: None,
        required: Vec::new(),
        fields: vec![FieldSpec::new(
            "selectedOptions",
            "Select Multiple Options",
            FieldKind::Array {
                items: Box::new(FieldKind::Choice(ADDITIONAL_OPTIONS)),
                min_items: Some(1),
                unique_items: true,
            },
        )],
    }
}

fn email() -> ObjectSpec {
    ObjectSpec {
        name: SECTION_EMAIL,
        title: None,
        required: vec!["email"],
        fields: vec![FieldSpec::new(
            "email",
            "Email",
            FieldKind::Text {
                min_length: None,
                format: None,
                pattern: Some(EMAIL_PATTERN),
            },
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_in_display_order() {
        let schema = reporting_form_schema();
        let names: Vec<_> = schema.sections.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "incidents",
                "injuredPersons",
                "medicalInfo",
                "witnessInfo",
                "additional",
                "email"
            ]
        );
    }

    #[test]
    fn test_every_required_field_is_defined() {
        let schema = reporting_form_schema();
        for section in &schema.sections {
            for required in &section.required {
                assert!(
                    section.field(required).is_some(),
                    "{}.{required} is required but undefined",
                    section.name
                );
            }
        }
    }

    #[test]
    fn test_every_rule_refers_to_defined_fields() {
        let schema = reporting_form_schema();
        for section in &schema.sections {
            for rule in section.rules() {
                assert!(section.field(rule.field).is_some());
                for dependent in rule.dependents {
                    assert!(section.field(dependent).is_some());
                }
            }
        }
    }

    #[test]
    fn test_choice_lists_contain_other() {
        for options in [INCIDENT_TYPES, INCIDENT_CATEGORIES, INJURY_NATURES, BODY_PARTS] {
            assert!(options.contains(&"Other"));
        }
    }

    #[test]
    fn test_email_pattern_compiles() {
        let regex = regex::Regex::new(EMAIL_PATTERN).unwrap();
        assert!(regex.is_match("safety.officer@example.com"));
        assert!(!regex.is_match("not-an-email"));
    }
}
