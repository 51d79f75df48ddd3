use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatdigest")]
#[command(version, about = "ChatDigest - summarize Telegram group chats on demand")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.config/chatdigest/config.toml)
    #[arg(long, short, global = true, env = "CHATDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to daily rolling files in this directory instead of stderr
    #[arg(long, global = true, env = "CHATDIGEST_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsArgs,
}

/// Settings that can be given on the command line or through the environment
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Telegram bot token from @BotFather
    #[arg(long, global = true, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// API key for the summarization model (falls back to LLM_API_KEY)
    #[arg(long, global = true, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, env = "CHATDIGEST_LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Model used for summaries
    #[arg(long, global = true, env = "CHATDIGEST_LLM_MODEL")]
    pub model: Option<String>,

    /// Maximum messages sent to the model per summary
    #[arg(long, global = true, env = "CHATDIGEST_MAX_RECORDS")]
    pub max_records: Option<usize>,

    /// What to do with messages beyond the limit: drop or requeue
    #[arg(long, global = true, env = "CHATDIGEST_OVERFLOW_POLICY")]
    pub overflow_policy: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Validate settings and check the Telegram connection
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings with secrets masked
    Show,
    /// Print the config file location
    Path,
}
