//! Bot runtime: routing inbound messages, commands and the receive loop.

mod commands;
mod directory;
mod handler;
mod router;

pub use commands::{CommandContext, handle_command};
pub use directory::{ConversationDirectory, GroupRef};
pub use handler::{MessageHandler, MessageHandlerConfig, start_message_handler};
pub use router::{MessageRouter, RouteDecision};
