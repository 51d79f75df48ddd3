//! Buffered message records.

use std::fmt;

use crate::channel::InboundMessage;

/// One buffered text message: who said it and what they said.
///
/// Records carry no identity beyond their position in a backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    author: String,
    text: String,
}

impl MessageRecord {
    /// Create a record, rejecting an empty body.
    ///
    /// An empty author is replaced by `"unknown"`.
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        let author = author.into();
        let author = if author.trim().is_empty() {
            "unknown".to_string()
        } else {
            author
        };

        Some(Self { author, text })
    }

    /// Build a record from an inbound channel message
    pub fn from_inbound(message: &InboundMessage) -> Option<Self> {
        Self::new(message.author(), message.content.as_str())
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}

/// Render records one per line, oldest first.
pub fn render_transcript(records: &[MessageRecord]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
