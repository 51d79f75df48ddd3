use anyhow::Result;
use colored::Colorize;

use crate::config::Settings;
use crate::setup::{build_channel, build_summarizer, connect};

/// Validate settings and check that Telegram accepts the bot token
pub async fn run(settings: &Settings) -> Result<()> {
    settings.validate()?;
    build_summarizer(settings)?;
    println!("{} settings are valid", "✓".green());

    let channel = build_channel(settings)?;
    let bot = connect(&channel).await?;
    println!(
        "{} connected to Telegram as @{}",
        "✓".green(),
        bot.username.as_deref().unwrap_or("unknown")
    );

    println!(
        "  model: {} at {}",
        settings.llm.model.bold(),
        settings.llm.base_url
    );
    println!(
        "  summaries: up to {} messages, overflow {}",
        settings.digest.max_records, settings.digest.overflow_policy
    );

    Ok(())
}
