use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("authentication required")
        || msg.contains("invalid or expired session")
        || msg.contains("access token")
    {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Provide a fresh session token with:");
        eprintln!("  {} export MEDICHAT_ACCESS_TOKEN=<token>", "$".dimmed());
    }

    if msg.contains("relay url") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set the relay endpoint in ~/.config/medichat/config.toml or with:");
        eprintln!("  {} export MEDICHAT_RELAY_URL=<url>", "$".dimmed());
    }

    if msg.contains("unknown doctor") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List available doctors with:");
        eprintln!("  {} medichat doctors", "$".dimmed());
    }

    if msg.contains("permission") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!(
            "  The assistant is limited to administrators. Ask one to grant your account access."
        );
    }

    if msg.contains("connection") || msg.contains("error sending request") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and the relay URL, then try again.");
    }

    std::process::exit(1);
}
