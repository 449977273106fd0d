//! Doctor persona catalog offered by the chat screen

/// A selectable doctor persona
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub prompt: &'static str,
}

pub const DEFAULT_PERSONA_ID: &str = "general";

pub const PERSONAS: &[Persona] = &[
    Persona {
        id: "general",
        name: "General practitioner",
        icon: "🩺",
        prompt: "You are a general practitioner specialising in primary care and general diagnosis. Give comprehensive advice and state when the patient should be referred to a specialist.",
    },
    Persona {
        id: "cardiologist",
        name: "Cardiologist",
        icon: "❤️",
        prompt: "You are a doctor specialising in cardiovascular disease. Focus on heart health, blood pressure, cholesterol and arterial disease.",
    },
    Persona {
        id: "dermatologist",
        name: "Dermatologist",
        icon: "🧴",
        prompt: "You are a doctor specialising in skin disease. Focus on skin problems, skin allergies, eczema and psoriasis.",
    },
    Persona {
        id: "neurologist",
        name: "Neurologist",
        icon: "🧠",
        prompt: "You are a doctor specialising in disorders of the nervous system. Focus on headaches, epilepsy, strokes and nerve disease.",
    },
    Persona {
        id: "orthopedic",
        name: "Orthopedist",
        icon: "🦴",
        prompt: "You are a doctor specialising in orthopaedic surgery. Focus on fractures, joint pain, arthritis and sports injuries.",
    },
    Persona {
        id: "pediatrician",
        name: "Pediatrician",
        icon: "👶",
        prompt: "You are a doctor specialising in paediatrics. Focus on child health, vaccinations, growth and development, and common childhood illnesses.",
    },
    Persona {
        id: "psychiatrist",
        name: "Psychiatrist",
        icon: "🧘",
        prompt: "You are a doctor specialising in psychiatry. Focus on depression, anxiety, sleep disorders and general mental health.",
    },
    Persona {
        id: "ophthalmologist",
        name: "Ophthalmologist",
        icon: "👁️",
        prompt: "You are a doctor specialising in ophthalmology. Focus on vision problems, cataracts, glaucoma and retinal disease.",
    },
    Persona {
        id: "ent",
        name: "ENT specialist",
        icon: "👂",
        prompt: "You are a doctor specialising in ear, nose and throat disease. Focus on ear infections, sinuses and throat problems.",
    },
    Persona {
        id: "gastroenterologist",
        name: "Gastroenterologist",
        icon: "🫁",
        prompt: "You are a doctor specialising in digestive disease. Focus on stomach, colon and liver problems, and acid reflux.",
    },
    Persona {
        id: "pulmonologist",
        name: "Pulmonologist",
        icon: "🌬️",
        prompt: "You are a doctor specialising in respiratory disease. Focus on asthma, chest allergies, pneumonia and lung disease.",
    },
    Persona {
        id: "urologist",
        name: "Urologist",
        icon: "💧",
        prompt: "You are a doctor specialising in urology. Focus on urinary tract infections, kidney stones and prostate problems.",
    },
];

/// Look up a persona by id (case-sensitive, as sent by the client)
pub fn find_persona(id: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|persona| persona.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_persona_ids_unique() {
        let ids: HashSet<_> = PERSONAS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), PERSONAS.len());
    }

    #[test]
    fn test_default_persona_exists() {
        assert!(find_persona(DEFAULT_PERSONA_ID).is_some());
        assert!(find_persona("astrologer").is_none());
    }
}
