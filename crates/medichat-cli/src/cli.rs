use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "medichat")]
#[command(version, about = "Medichat - AI medical assistant for patient records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/medichat/config.toml)
    #[arg(long, global = true, env = "MEDICHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask the medical assistant a question about a patient
    Ask(AskArgs),

    /// List the available doctor personas
    Doctors,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct AskArgs {
    /// The question (optional when an image is attached)
    pub question: Option<String>,

    /// Doctor persona id (see `medichat doctors`)
    #[arg(short, long)]
    pub doctor: Option<String>,

    /// Attach a medical image
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// TOML file with patient fields
    #[arg(long)]
    pub patient_file: Option<PathBuf>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub age: Option<String>,

    #[arg(long)]
    pub gender: Option<String>,

    #[arg(long)]
    pub medications: Option<String>,

    #[arg(long)]
    pub conditions: Option<String>,

    #[arg(long)]
    pub allergies: Option<String>,

    /// Relay endpoint URL
    #[arg(long, env = "MEDICHAT_RELAY_URL")]
    pub relay_url: Option<String>,

    /// Session access token
    #[arg(long, env = "MEDICHAT_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Save the conversation to the patient's records
    #[arg(long)]
    pub save: bool,

    /// Patient record id to attach the saved conversation to
    #[arg(long, requires = "save")]
    pub patient_id: Option<String>,
}
