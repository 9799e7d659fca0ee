//! The report document.
//!
//! A report is one nested JSON object keyed by section (`incidents`,
//! `injuredPersons`, `medicalInfo`, `witnessInfo`, `additional`, `email`).
//! Fields are addressed with dotted paths such as `incidents.site_name`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Section holding incident details, the diagram marker and uploads.
pub const SECTION_INCIDENTS: &str = "incidents";
/// Section describing the injured person.
pub const SECTION_INJURED_PERSONS: &str = "injuredPersons";
/// Section with hospital and certificate details.
pub const SECTION_MEDICAL_INFO: &str = "medicalInfo";
/// Section with the witness statement.
pub const SECTION_WITNESS_INFO: &str = "witnessInfo";
/// Section with the multi-select options.
pub const SECTION_ADDITIONAL: &str = "additional";
/// Section with the reporter's e-mail address.
pub const SECTION_EMAIL: &str = "email";

/// Path of the stored marker position.
pub const MARKER_POSITION_PATH: &str = "incidents.injured_diagram.marker_position";
/// Path of the diagram image URL stored with the marker.
pub const DIAGRAM_IMAGE_URL_PATH: &str = "incidents.injured_diagram.image_url";
/// Path of the uploaded image data URLs.
pub const IMAGE_UPLOAD_PATH: &str = "incidents.image_upload";

/// A marker position in rendered image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPosition {
    /// Horizontal offset from the image's left edge.
    pub x: i64,
    /// Vertical offset from the image's top edge.
    pub y: i64,
}

/// The whole incident report as edited by the form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDocument(Map<String, Value>);

impl ReportDocument {
    /// Create an empty document (`{}`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::field_value(
                "document",
                format!("expected a JSON object, found {}", kind_of(&other)),
            )),
        }
    }

    /// Parse persisted document text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Serialize the document for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Borrow the document as a JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Clone the document into a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Whether the document is `{}`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a value by dotted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Look up a string field.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Set a value at a dotted path, creating intermediate objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, has an empty segment, or crosses
    /// a value that is not an object.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| Error::field_path(path, "path is empty"))?;

        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry.as_object_mut().ok_or_else(|| {
                Error::field_path(path, format!("'{segment}' is not an object"))
            })?;
        }
        current.insert((*last).to_string(), value);
        Ok(())
    }

    /// Remove the value at a dotted path, returning it if present.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;
        let mut current = &mut self.0;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Apply a JSON merge patch (RFC 7386).
    ///
    /// Objects merge recursively, `null` deletes the key, anything else
    /// replaces the existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch` is not an object.
    pub fn merge(&mut self, patch: &Value) -> Result<()> {
        let Value::Object(patch) = patch else {
            return Err(Error::field_value(
                "patch",
                format!("expected a JSON object, found {}", kind_of(patch)),
            ));
        };
        merge_map(&mut self.0, patch);
        Ok(())
    }

    /// The stored diagram marker, if both coordinates are present.
    #[must_use]
    pub fn marker_position(&self) -> Option<MarkerPosition> {
        let marker = self.get(MARKER_POSITION_PATH)?;
        let x = coordinate(marker.get("x")?)?;
        let y = coordinate(marker.get("y")?)?;
        Some(MarkerPosition { x, y })
    }

    /// Store a diagram marker together with the diagram image URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `incidents` or `incidents.injured_diagram` holds a
    /// non-object value.
    pub fn set_marker(&mut self, position: MarkerPosition, image_url: &str) -> Result<()> {
        self.set(DIAGRAM_IMAGE_URL_PATH, Value::String(image_url.to_string()))?;
        self.set(MARKER_POSITION_PATH, serde_json::to_value(position)?)
    }

    /// The uploaded image data URLs, in upload order.
    #[must_use]
    pub fn image_uploads(&self) -> Vec<String> {
        self.get(IMAGE_UPLOAD_PATH)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the uploaded image data URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if `incidents` holds a non-object value.
    pub fn set_image_uploads(&mut self, data_urls: &[String]) -> Result<()> {
        let items = data_urls.iter().cloned().map(Value::String).collect();
        self.set(IMAGE_UPLOAD_PATH, Value::Array(items))
    }
}

impl From<ReportDocument> for Value {
    fn from(document: ReportDocument) -> Self {
        Value::Object(document.0)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(Error::field_path(path, "path is empty"));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::field_path(path, "path has an empty segment"));
    }
    Ok(segments)
}

fn merge_map(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(child_patch) => {
                let entry = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(child) = entry {
                    merge_map(child, child_patch);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coordinate(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v.round() as i64))
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
