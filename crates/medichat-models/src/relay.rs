//! Inbound relay payload and error envelope

use serde::{Deserialize, Serialize};

use crate::patient::PatientInfo;

/// Body of a `POST` to the relay
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub patient_info: PatientInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_prompt: Option<String>,
    /// Inline image as a `data:image/...;base64,` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// JSON body of every non-streaming relay response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
