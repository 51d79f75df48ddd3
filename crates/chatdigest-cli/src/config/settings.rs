//! Layered bot settings
//!
//! Defaults, then `~/.config/chatdigest/config.toml` (or `--config`), then
//! environment variables and command line flags.

use anyhow::{Context, Result, bail};
use chatdigest_ai::llm::{DEEPSEEK_BASE_URL, DEEPSEEK_DEFAULT_MODEL};
use chatdigest_core::digest::{DEFAULT_MAX_RECORDS, OverflowPolicy, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::SettingsArgs;

const MASK: &str = "********";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub digest: DigestSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub polling_timeout: u32,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            polling_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEEPSEEK_BASE_URL.to_string(),
            model: DEEPSEEK_DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestSettings {
    pub max_records: usize,
    pub overflow_policy: OverflowPolicy,
    /// Instructions sent ahead of the transcript
    pub prompt: Option<String>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            overflow_policy: OverflowPolicy::default(),
            prompt: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chatdigest").join("config.toml"))
    }

    /// Apply command line and environment values on top of the file.
    ///
    /// `fallback_api_key` (from `LLM_API_KEY`) is used only when no
    /// `DEEPSEEK_API_KEY`/`--api-key` is given.
    pub fn apply_overrides(
        &mut self,
        args: &SettingsArgs,
        fallback_api_key: Option<String>,
    ) -> Result<()> {
        if let Some(token) = non_empty(&args.telegram_token) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(key) = non_empty(&args.api_key).or_else(|| non_empty(&fallback_api_key)) {
            self.llm.api_key = Some(key);
        }
        if let Some(base_url) = non_empty(&args.base_url) {
            self.llm.base_url = base_url;
        }
        if let Some(model) = non_empty(&args.model) {
            self.llm.model = model;
        }
        if let Some(max_records) = args.max_records {
            self.digest.max_records = max_records;
        }
        if let Some(policy) = &args.overflow_policy {
            self.digest.overflow_policy = policy.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Check that the bot can start with these settings
    pub fn validate(&self) -> Result<()> {
        self.bot_token()?;
        self.api_key()?;
        if self.digest.max_records == 0 {
            bail!("digest.max_records must be at least 1");
        }
        Ok(())
    }

    pub fn bot_token(&self) -> Result<&str> {
        secret(&self.telegram.bot_token).context(
            "Telegram bot token not found. Set TELEGRAM_BOT_TOKEN or telegram.bot_token",
        )
    }

    pub fn api_key(&self) -> Result<&str> {
        secret(&self.llm.api_key)
            .context("LLM API key not found. Set DEEPSEEK_API_KEY or llm.api_key")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_max_records(self.digest.max_records)
            .with_overflow_policy(self.digest.overflow_policy)
    }

    /// Copy with secrets replaced, for display
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if masked.telegram.bot_token.is_some() {
            masked.telegram.bot_token = Some(MASK.to_string());
        }
        if masked.llm.api_key.is_some() {
            masked.llm.api_key = Some(MASK.to_string());
        }
        masked
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn secret(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
