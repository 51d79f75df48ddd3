mod settings;

pub use settings::{DigestSettings, LlmSettings, Settings, TelegramSettings};
