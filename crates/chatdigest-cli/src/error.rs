use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("telegram bot token not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Create a bot with @BotFather, then set its token:");
        eprintln!("  {} export TELEGRAM_BOT_TOKEN=<token>", "$".dimmed());
    }

    if msg.contains("llm api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set your DeepSeek API key with:");
        eprintln!("  {} export DEEPSEEK_API_KEY=<key>", "$".dimmed());
    }

    if msg.contains("unauthorized") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Telegram rejected the bot token. Check it with @BotFather.");
    }

    if msg.contains("config file") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Show where settings are read from with:");
        eprintln!("  {} chatdigest config path", "$".dimmed());
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
