use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::Colorize;
use medichat_models::{ImageAttachment, PatientInfo, Persona, find_persona};
use medichat_stream::{ChatSession, RelayClient, RestConversationStore, TurnOutcome};
use serde_json::json;
use std::io::{self, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::cli::{AskArgs, OutputFormat};
use crate::config::CliConfig;

pub async fn run(args: AskArgs, config: &CliConfig, format: OutputFormat) -> Result<()> {
    let relay_url = args
        .relay_url
        .clone()
        .or_else(|| config.relay.url.clone())
        .context("No relay URL configured (use --relay-url or MEDICHAT_RELAY_URL)")?;
    let token = args
        .token
        .clone()
        .or_else(|| config.relay.access_token.clone())
        .context("No access token configured (use --token or MEDICHAT_ACCESS_TOKEN)")?;

    let persona = resolve_persona(args.doctor.as_deref().or(config.default.doctor.as_deref()))?;
    let patient = load_patient(&args)?;
    let image = args.image.as_deref().map(read_image).transpose()?;

    let mut session = ChatSession::new(RelayClient::new(relay_url, token.clone()), patient);
    if let Some(persona) = persona {
        session = session.with_persona(persona);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut printer = DeltaPrinter::new(io::stdout(), !format.is_json());
    let outcome = session
        .ask(args.question.clone(), image, &cancel, |message| {
            printer.update(&message.content)
        })
        .await?;
    printer.finish();

    match outcome {
        TurnOutcome::Completed => {}
        TurnOutcome::Truncated => eprintln!("{}", "(the answer was cut off)".yellow()),
        TurnOutcome::Cancelled => eprintln!("{}", "(stopped)".yellow()),
    }

    let answer = session
        .conversation()
        .messages()
        .iter()
        .rev()
        .find(|message| message.is_assistant())
        .map(|message| message.content.clone())
        .unwrap_or_default();

    let conversation_id = if args.save {
        let url = config
            .records
            .url
            .as_deref()
            .context("No records URL configured in [records]")?;
        let api_key = config.records.api_key.as_deref().unwrap_or_default();
        let store = RestConversationStore::new(url, api_key, token);
        session.hand_off(&store, args.patient_id.as_deref()).await?
    } else {
        None
    };

    if format.is_json() {
        let output = json!({
            "doctor": persona.map(|p| p.id),
            "answer": answer,
            "outcome": outcome_label(outcome),
            "conversation_id": conversation_id,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(id) = conversation_id {
        eprintln!("{} {}", "Saved conversation".green(), id);
    }

    Ok(())
}

fn outcome_label(outcome: TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Completed => "completed",
        TurnOutcome::Truncated => "truncated",
        TurnOutcome::Cancelled => "cancelled",
    }
}

fn resolve_persona(id: Option<&str>) -> Result<Option<&'static Persona>> {
    match id {
        None => Ok(None),
        Some(id) => find_persona(id)
            .map(Some)
            .with_context(|| format!("Unknown doctor '{id}'")),
    }
}

/// Patient fields from `--patient-file`, overridden by individual flags
fn load_patient(args: &AskArgs) -> Result<PatientInfo> {
    let mut patient = match &args.patient_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read patient file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid patient file {}", path.display()))?
        }
        None => PatientInfo::default(),
    };

    let overrides = [
        (&mut patient.name, &args.name),
        (&mut patient.age, &args.age),
        (&mut patient.gender, &args.gender),
        (&mut patient.medications, &args.medications),
        (&mut patient.conditions, &args.conditions),
        (&mut patient.allergies, &args.allergies),
    ];
    for (field, value) in overrides {
        if value.is_some() {
            *field = value.clone();
        }
    }
    Ok(patient)
}

/// Encode an image file as an inline data URL
fn read_image(path: &Path) -> Result<ImageAttachment> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .with_context(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    if bytes.is_empty() {
        bail!("Image file is empty: {}", path.display());
    }
    Ok(ImageAttachment::new(format!(
        "data:{};base64,{}",
        mime.essence_str(),
        STANDARD.encode(bytes)
    )))
}

/// Writes only the newly appended tail of a growing answer
struct DeltaPrinter<W: Write> {
    out: W,
    enabled: bool,
    printed: usize,
}

impl<W: Write> DeltaPrinter<W> {
    fn new(out: W, enabled: bool) -> Self {
        Self {
            out,
            enabled,
            printed: 0,
        }
    }

    fn update(&mut self, content: &str) {
        if !self.enabled || content.len() <= self.printed {
            return;
        }
        let _ = self.out.write_all(content[self.printed..].as_bytes());
        let _ = self.out.flush();
        self.printed = content.len();
    }

    fn finish(&mut self) {
        if self.enabled && self.printed > 0 {
            let _ = writeln!(self.out);
        }
    }
}
