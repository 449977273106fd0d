use medichat_models::{PatientInfo, RelayRequest};

use crate::error::{RelayError, Result};

pub const MAX_QUESTION_CHARS: usize = 1000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_HISTORY_FIELD_CHARS: usize = 500;
pub const MAX_DOCTOR_TYPE_CHARS: usize = 50;
pub const MAX_DOCTOR_PROMPT_CHARS: usize = 2000;

/// A payload that passed every check. Blank optional strings are normalized
/// to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub patient: PatientInfo,
    pub question: Option<String>,
    pub doctor_type: Option<String>,
    pub doctor_prompt: Option<String>,
    pub image: Option<String>,
}

pub fn parse_request(body: &[u8]) -> Result<RelayRequest> {
    serde_json::from_slice(body)
        .map_err(|err| RelayError::invalid("body", format!("malformed request ({err})")))
}

pub fn validate(request: RelayRequest) -> Result<ValidatedRequest> {
    let question = non_blank(request.question);
    let image = non_blank(request.image);

    if question.is_none() && image.is_none() {
        return Err(RelayError::invalid(
            "question",
            "a question or an image is required",
        ));
    }

    check_len("question", question.as_deref(), MAX_QUESTION_CHARS)?;

    let patient = &request.patient_info;
    check_len("patientInfo.name", patient.name.as_deref(), MAX_NAME_CHARS)?;
    check_len(
        "patientInfo.medications",
        patient.medications.as_deref(),
        MAX_HISTORY_FIELD_CHARS,
    )?;
    check_len(
        "patientInfo.conditions",
        patient.conditions.as_deref(),
        MAX_HISTORY_FIELD_CHARS,
    )?;
    check_len(
        "patientInfo.allergies",
        patient.allergies.as_deref(),
        MAX_HISTORY_FIELD_CHARS,
    )?;

    let doctor_type = non_blank(request.doctor_type);
    let doctor_prompt = non_blank(request.doctor_prompt);
    check_len("doctorType", doctor_type.as_deref(), MAX_DOCTOR_TYPE_CHARS)?;
    check_len("doctorPrompt", doctor_prompt.as_deref(), MAX_DOCTOR_PROMPT_CHARS)?;

    if let Some(image) = &image {
        check_image(image)?;
    }

    Ok(ValidatedRequest {
        patient: request.patient_info,
        question,
        doctor_type,
        doctor_prompt,
        image,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(RelayError::invalid(
            field,
            format!("must be at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

/// Accepts `data:image/<subtype>;base64,<payload>` only
fn check_image(url: &str) -> Result<()> {
    let invalid = || RelayError::invalid("image", "must be a base64 image data URL");

    let rest = url.strip_prefix("data:image/").ok_or_else(invalid)?;
    let (subtype, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let subtype_ok = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !subtype_ok || payload.is_empty() {
        return Err(invalid());
    }
    Ok(())
}
