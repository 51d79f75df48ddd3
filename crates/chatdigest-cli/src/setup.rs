//! CLI setup module
//!
//! Builds the Telegram channel, the summarizer and the bot core from settings.

use anyhow::{Context, Result};
use chatdigest_ai::{LlmRetryConfig, OpenAIClient};
use chatdigest_core::AppCore;
use chatdigest_core::channel::{TelegramChannel, TelegramConfig, TelegramUser};
use chatdigest_core::digest::LlmSummarizer;
use chatdigest_core::runtime::MessageHandlerConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Settings;

pub fn build_channel(settings: &Settings) -> Result<Arc<TelegramChannel>> {
    let config = TelegramConfig::new(settings.bot_token()?)
        .with_polling_timeout(settings.telegram.polling_timeout);
    Ok(Arc::new(TelegramChannel::new(config)))
}

pub fn build_summarizer(settings: &Settings) -> Result<LlmSummarizer> {
    let llm = OpenAIClient::deepseek(settings.api_key()?)
        .with_base_url(&settings.llm.base_url)
        .with_model(&settings.llm.model)
        .with_timeout(Duration::from_secs(settings.llm.timeout_secs))
        .with_retry_config(LlmRetryConfig::default().with_max_retries(settings.llm.max_retries));

    let summarizer = LlmSummarizer::new(Arc::new(llm));
    Ok(match &settings.digest.prompt {
        Some(prompt) if !prompt.trim().is_empty() => summarizer.with_prompt(prompt.trim()),
        _ => summarizer,
    })
}

/// Check the bot token against Telegram and return the bot account
pub async fn connect(channel: &TelegramChannel) -> Result<TelegramUser> {
    let me = channel
        .test_connection()
        .await
        .context("Failed to reach Telegram")?;
    info!(
        "Connected to Telegram as @{}",
        me.username.as_deref().unwrap_or("unknown")
    );
    Ok(me)
}

/// Build the bot core around a connected channel
pub fn prepare_core(
    settings: &Settings,
    channel: Arc<TelegramChannel>,
    bot: &TelegramUser,
) -> Result<AppCore> {
    let summarizer = build_summarizer(settings)?;
    let handler_config = MessageHandlerConfig {
        bot_username: bot.username.clone(),
        ..MessageHandlerConfig::default()
    };

    Ok(AppCore::new(
        channel,
        Arc::new(summarizer),
        settings.pipeline_config(),
        handler_config,
    ))
}
