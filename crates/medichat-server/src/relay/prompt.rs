use medichat_models::{
    ContentPart, ImageUrl, MessageContent, PatientInfo, ProviderMessage, ProviderRequest,
    find_persona,
};
use std::fmt::Write as _;

use super::validation::ValidatedRequest;

pub const DEFAULT_PERSONA_PROMPT: &str = "You are an intelligent medical assistant. You will receive information about a patient and a medical question. Give helpful, informative answers.";

pub const DISCLAIMER: &str = "Important notice: this information is for educational purposes only and does not replace a consultation with a qualified doctor. The patient should always see a doctor for an accurate diagnosis and appropriate treatment.";

pub const IMAGE_NOTE: &str = "The patient has attached a medical image. Describe what you observe, note anything that may need attention, and do not present your observations as a diagnosis.";

/// User text sent when only an image was attached
pub const IMAGE_ONLY_QUESTION: &str = "Please analyze this medical image.";

const NOT_SPECIFIED: &str = "Not specified";
const NONE_REPORTED: &str = "None";

/// Build the outbound streaming request for a validated payload
pub fn compose(request: &ValidatedRequest, model: &str) -> ProviderRequest {
    let system = system_instruction(request);

    let text = request
        .question
        .clone()
        .unwrap_or_else(|| IMAGE_ONLY_QUESTION.to_string());
    let content = match &request.image {
        Some(url) => MessageContent::Parts(vec![
            ContentPart::Text { text },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: url.clone() },
            },
        ]),
        None => MessageContent::Text(text),
    };

    ProviderRequest {
        model: model.to_string(),
        messages: vec![ProviderMessage::system(system), ProviderMessage::user(content)],
        stream: true,
    }
}

/// Caller prompt first, then the catalog entry for `doctorType`, then the
/// generic assistant
fn persona_prompt(request: &ValidatedRequest) -> &str {
    if let Some(prompt) = request.doctor_prompt.as_deref() {
        return prompt.trim();
    }
    request
        .doctor_type
        .as_deref()
        .and_then(|id| find_persona(id.trim()))
        .map(|persona| persona.prompt)
        .unwrap_or(DEFAULT_PERSONA_PROMPT)
}

fn system_instruction(request: &ValidatedRequest) -> String {
    let mut out = String::new();
    out.push_str(persona_prompt(request));
    out.push_str("\n\n");
    out.push_str(DISCLAIMER);
    out.push_str("\n\n");
    render_patient(&mut out, &request.patient);
    if request.image.is_some() {
        out.push_str("\n\n");
        out.push_str(IMAGE_NOTE);
    }
    out
}

fn render_patient(out: &mut String, patient: &PatientInfo) {
    let rows = [
        ("Name", &patient.name, NOT_SPECIFIED),
        ("Age", &patient.age, NOT_SPECIFIED),
        ("Gender", &patient.gender, NOT_SPECIFIED),
        ("Current medications", &patient.medications, NONE_REPORTED),
        ("Previous conditions", &patient.conditions, NONE_REPORTED),
        ("Allergies", &patient.allergies, NONE_REPORTED),
    ];

    out.push_str("Patient information:");
    for (label, value, placeholder) in rows {
        let value = PatientInfo::present(value).unwrap_or(placeholder);
        let _ = write!(out, "\n- {label}: {value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(question: Option<&str>, image: Option<&str>) -> ValidatedRequest {
        ValidatedRequest {
            patient: PatientInfo::default(),
            question: question.map(str::to_string),
            doctor_type: None,
            doctor_prompt: None,
            image: image.map(str::to_string),
        }
    }

    fn system_text(request: &ProviderRequest) -> &str {
        match &request.messages[0].content {
            MessageContent::Text(text) => text,
            MessageContent::Parts(_) => panic!("system message must be plain text"),
        }
    }

    #[test]
    fn test_absent_patient_fields_render_placeholders() {
        let mut request = validated(Some("Why do I feel dizzy?"), None);
        request.patient.name = Some("Sara".to_string());
        request.patient.medications = Some("   ".to_string());

        let composed = compose(&request, "m");
        let system = system_text(&composed);
        assert!(system.starts_with(DEFAULT_PERSONA_PROMPT));
        assert!(system.contains("- Name: Sara"));
        assert!(system.contains("- Age: Not specified"));
        assert!(system.contains("- Gender: Not specified"));
        assert!(system.contains("- Current medications: None"));
        assert!(system.contains("- Previous conditions: None"));
        assert!(system.contains("- Allergies: None"));
        assert!(!system.contains(IMAGE_NOTE));
    }

    #[test]
    fn test_text_only_user_turn_is_bare_string() {
        let composed = compose(
            &validated(Some("Is 38.5C a fever?"), None),
            "google/gemini-2.5-flash",
        );
        assert!(composed.stream);
        assert_eq!(composed.model, "google/gemini-2.5-flash");
        assert_eq!(composed.messages.len(), 2);
        assert_eq!(composed.messages[1].role, "user");
        assert_eq!(
            composed.messages[1].content,
            MessageContent::Text("Is 38.5C a fever?".to_string())
        );
    }

    #[test]
    fn test_image_only_uses_fallback_question() {
        let url = "data:image/jpeg;base64,/9j/4AAQ";
        let composed = compose(&validated(None, Some(url)), "m");
        assert!(system_text(&composed).ends_with(IMAGE_NOTE));

        let json = serde_json::to_value(&composed.messages[1]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": IMAGE_ONLY_QUESTION},
                    {"type": "image_url", "image_url": {"url": url}}
                ]
            })
        );
    }

    #[test]
    fn test_persona_resolution_order() {
        let mut request = validated(Some("q"), None);
        request.doctor_type = Some("cardiologist".to_string());
        let cardiologist = find_persona("cardiologist").unwrap();
        assert!(system_text(&compose(&request, "m")).starts_with(cardiologist.prompt));

        request.doctor_prompt = Some("You are a sleep specialist.".to_string());
        assert!(system_text(&compose(&request, "m")).starts_with("You are a sleep specialist."));

        let mut unknown = validated(Some("q"), None);
        unknown.doctor_type = Some("astrologer".to_string());
        assert!(system_text(&compose(&unknown, "m")).starts_with(DEFAULT_PERSONA_PROMPT));
    }
}
