//! Chat Channel Layer
//!
//! Connects the bot to a chat platform. Everything above this layer talks to
//! the [`Channel`] trait only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      digest / runtime                   │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │         trait Channel                   │
//! │  - send(message)                        │
//! │  - delete_message(conversation, id)     │
//! │  - start_receiving() -> Stream          │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//!          Telegram
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chatdigest_core::channel::{Channel, OutboundMessage, TelegramChannel};
//!
//! let telegram = TelegramChannel::with_token(bot_token);
//! telegram.send(OutboundMessage::info("-100123", "Bot started")).await?;
//! ```

pub mod chunk;
mod telegram;
mod traits;
mod types;

pub use telegram::{TelegramChannel, TelegramConfig, TelegramUser};
pub use traits::{Channel, InboundStream};
pub use types::{ConversationKind, InboundMessage, MessageLevel, OutboundMessage};

#[cfg(any(test, feature = "test-utils"))]
pub use traits::mock;
