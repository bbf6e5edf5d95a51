use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("cannot read") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Point syncbot at your config file with:");
        eprintln!("  {} syncbot --config <path>", "$".dimmed());
    }

    if msg.contains("rejected bot token") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check Discord.BotToken in your config file.");
    }

    if msg.contains("failed to bind") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Another process may be using Server.ListenAddr; pick a free port.");
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
