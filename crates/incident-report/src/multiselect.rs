//! Multi-select widget over a schema enumeration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::FieldSpec;

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Text shown to the user.
    pub label: String,
    /// Value stored in the document.
    pub value: String,
}

/// Selects any number of values from a fixed option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelectWidget {
    options: Vec<SelectOption>,
}

impl MultiSelectWidget {
    /// Build a widget from enumerated values; labels equal values.
    #[must_use]
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let options = values
            .iter()
            .map(|v| SelectOption {
                label: v.as_ref().to_string(),
                value: v.as_ref().to_string(),
            })
            .collect();
        Self { options }
    }

    /// Build a widget for a schema field, if it declares options.
    #[must_use]
    pub fn for_field(field: &FieldSpec) -> Option<Self> {
        field.kind.options().map(Self::new)
    }

    /// Every option, in schema order.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Options preselected for `value`, in schema order.
    ///
    /// Anything in `value` that is not a known option is ignored.
    #[must_use]
    pub fn selected(&self, value: Option<&Value>) -> Vec<&SelectOption> {
        let current: Vec<&str> = value
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        self.options
            .iter()
            .filter(|opt| current.contains(&opt.value.as_str()))
            .collect()
    }

    /// The value emitted for a new selection, in selection order.
    #[must_use]
    pub fn change<S: AsRef<str>>(&self, selection: &[S]) -> Value {
        Value::Array(
            selection
                .iter()
                .map(|s| Value::String(s.as_ref().to_string()))
                .collect(),
        )
    }
}
