//! Patient context carried with each question

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Free-text patient fields as entered on the patient form.
///
/// Every field is optional. `age` is accepted as either a JSON number or a
/// string since the form stores it as text but saved records hold an integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientInfo {
    #[serde(default, deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub medications: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub conditions: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub allergies: Option<String>,
}

impl PatientInfo {
    /// Returns the value only if it has visible content
    pub fn present(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
