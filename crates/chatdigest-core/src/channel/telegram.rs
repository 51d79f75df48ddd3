//! Telegram Channel Implementation
//!
//! Implements communication with Telegram via the Bot API: sending and
//! deleting messages, and receiving text messages via long-polling.
//!
//! The bot must have privacy mode disabled (via @BotFather) to see ordinary
//! group messages.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::chunk::chunk_text;
use super::traits::{Channel, InboundStream};
use super::types::{ConversationKind, InboundMessage, OutboundMessage};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;
/// Pause after a failed poll before trying again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Polling timeout in seconds (default: 30)
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
    /// Bot API base URL, token is appended directly
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_polling_timeout() -> u32 {
    30
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl TelegramConfig {
    /// Create a new config with just the bot token
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            polling_timeout: default_polling_timeout(),
            api_base: default_api_base(),
        }
    }

    /// Set polling timeout
    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }

    /// Point the channel at a different Bot API server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Telegram channel implementation
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    /// Whether polling is active
    polling_active: Arc<AtomicBool>,
    /// Last update ID for long-polling
    last_update_id: Arc<AtomicI64>,
}

impl TelegramChannel {
    /// Parse conversation_id into (chat_id, thread_id)
    /// Format: "chat_id" or "chat_id:thread_id"
    fn parse_conversation_id(conversation_id: &str) -> (String, Option<i64>) {
        match conversation_id.split_once(':') {
            Some((chat_id, thread_part)) => (chat_id.to_string(), thread_part.parse::<i64>().ok()),
            None => (conversation_id.to_string(), None),
        }
    }

    fn build_conversation_id(chat_id: i64, message_thread_id: Option<i64>) -> String {
        match message_thread_id {
            Some(thread_id) => format!("{}:{}", chat_id, thread_id),
            None => chat_id.to_string(),
        }
    }

    /// Extract the numeric Telegram message id from our "tg_<id>" format
    fn parse_message_id(message_id: &str) -> Option<i64> {
        message_id.strip_prefix("tg_")?.parse::<i64>().ok()
    }

    /// Create a new Telegram channel
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Create with just bot token
    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    /// Return current last processed update ID.
    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    /// Ask the polling task to stop after its current request
    pub fn stop_polling(&self) {
        self.polling_active.store(false, Ordering::SeqCst);
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.config.api_base, self.config.bot_token, method)
    }

    /// POST a Bot API method and unwrap the `{ok, result, description}` envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body: TelegramResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                return Err(anyhow!("Telegram HTTP error {}: {}", status, e));
            }
            Err(e) => return Err(e.into()),
        };

        if body.ok {
            body.result
                .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
        } else {
            Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ))
        }
    }

    /// Send message via Telegram API
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
        message_thread_id: Option<i64>,
    ) -> Result<TelegramMessageResponse> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        if let Some(id) = reply_to_message_id.and_then(Self::parse_message_id) {
            params["reply_parameters"] = serde_json::json!({
                "message_id": id,
                "allow_sending_without_reply": true,
            });
        }

        // Add message_thread_id for Telegram forum/supergroup topics
        if let Some(thread_id) = message_thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        self.call(
            "sendMessage",
            &params,
            Duration::from_secs(API_TIMEOUT_SECS),
        )
        .await
    }

    /// Poll for updates using long-polling
    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message"],
        });

        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                &params,
                Duration::from_secs(self.config.polling_timeout as u64 + 10),
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }

        Ok(updates)
    }

    /// Convert Telegram update to InboundMessage
    ///
    /// Only text messages with a known sender are kept. Forum topics get
    /// their own conversation; a reply in an ordinary supergroup also carries
    /// `message_thread_id` but stays in the chat's conversation.
    fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let from = message.from?;
        let text = message.text.filter(|text| !text.trim().is_empty())?;
        let topic_id = message
            .message_thread_id
            .filter(|_| message.is_topic_message == Some(true));
        let conversation_id = Self::build_conversation_id(message.chat.id, topic_id);

        let sender_name = from
            .username
            .as_ref()
            .map(|username| format!("@{}", username))
            .or_else(|| {
                Some(format!(
                    "{}{}",
                    from.first_name.as_deref().unwrap_or(""),
                    from.last_name
                        .as_ref()
                        .map(|l| format!(" {}", l))
                        .unwrap_or_default()
                ))
            })
            .map(|name| name.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut inbound = InboundMessage::new(
            format!("tg_{}", message.message_id),
            from.id.to_string(),
            conversation_id,
            text,
        )
        .with_kind(ConversationKind::from_telegram(&message.chat.r#type));
        inbound.sender_name = sender_name;
        inbound.conversation_title = message.chat.title;

        Some(inbound)
    }

    /// Test the connection by calling getMe
    pub async fn test_connection(&self) -> Result<TelegramUser> {
        self.call(
            "getMe",
            &serde_json::json!({}),
            Duration::from_secs(API_TIMEOUT_SECS),
        )
        .await
    }

    fn clone_for_polling(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            polling_active: self.polling_active.clone(),
            last_update_id: self.last_update_id.clone(),
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "Telegram"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let formatted = message.formatted_content();
        let (chat_id, thread_id) = Self::parse_conversation_id(&message.conversation_id);

        let chunks = chunk_text(&formatted, None);
        for (index, chunk) in chunks.iter().enumerate() {
            // Only the first chunk is threaded as a reply
            let reply_to = if index == 0 {
                message.reply_to.as_deref()
            } else {
                None
            };
            self.send_message(&chat_id, chunk, reply_to, thread_id)
                .await?;
        }

        Ok(())
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let (chat_id, _) = Self::parse_conversation_id(conversation_id);
        let numeric_id = Self::parse_message_id(message_id)
            .ok_or_else(|| anyhow!("Not a Telegram message id: {}", message_id))?;

        let params = serde_json::json!({
            "chat_id": chat_id,
            "message_id": numeric_id,
        });
        let _: bool = self
            .call(
                "deleteMessage",
                &params,
                Duration::from_secs(API_TIMEOUT_SECS),
            )
            .await?;
        Ok(())
    }

    fn start_receiving(&self) -> Option<InboundStream> {
        if !self.is_configured() {
            return None;
        }

        if self.polling_active.swap(true, Ordering::SeqCst) {
            warn!("Telegram polling already running");
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.clone_for_polling();

        tokio::spawn(async move {
            info!("Starting Telegram polling");

            while channel.polling_active.load(Ordering::SeqCst) {
                match channel.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            let Some(message) = Self::convert_update(update) else {
                                continue;
                            };
                            debug!(
                                "Received Telegram message: {} from {}",
                                message.id, message.sender_id
                            );
                            if tx.send(message).is_err() {
                                warn!("Message receiver dropped, stopping polling");
                                channel.polling_active.store(false, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Telegram polling error: {}", e);
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    }
                }
            }

            info!("Telegram polling stopped");
        });

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    message_thread_id: Option<i64>,
    /// Set only for messages posted in a forum topic
    is_topic_message: Option<bool>,
    text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    r#type: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    #[allow(dead_code)]
    message_id: i64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{ConversationBuffer, MessageRecord};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_update(chat_type: &str, title: Option<&str>, text: Option<&str>) -> TelegramUpdate {
        TelegramUpdate {
            update_id: 12345,
            message: Some(TelegramMessage {
                message_id: 100,
                from: Some(TelegramUser {
                    id: 42,
                    is_bot: false,
                    first_name: Some("John".to_string()),
                    last_name: Some("Doe".to_string()),
                    username: Some("johndoe".to_string()),
                }),
                chat: TelegramChat {
                    id: -999,
                    r#type: chat_type.to_string(),
                    title: title.map(str::to_string),
                },
                message_thread_id: None,
                is_topic_message: None,
                text: text.map(str::to_string),
            }),
        }
    }

    fn channel_for(server: &MockServer) -> TelegramChannel {
        TelegramChannel::new(
            TelegramConfig::new("123:ABC").with_api_base(format!("{}/bot", server.uri())),
        )
    }

    #[test]
    fn test_telegram_config_builder() {
        let config = TelegramConfig::new("test-token").with_polling_timeout(60);

        assert_eq!(config.bot_token, "test-token");
        assert_eq!(config.polling_timeout, 60);
        assert_eq!(config.api_base, TELEGRAM_API_BASE);
    }

    #[test]
    fn test_telegram_channel_is_configured() {
        assert!(TelegramChannel::with_token("test-token").is_configured());
        assert!(!TelegramChannel::with_token("").is_configured());
    }

    #[test]
    fn test_api_url() {
        let channel = TelegramChannel::with_token("123:ABC");
        assert_eq!(
            channel.api_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn test_parse_message_id() {
        assert_eq!(TelegramChannel::parse_message_id("tg_77"), Some(77));
        assert_eq!(TelegramChannel::parse_message_id("77"), None);
        assert_eq!(TelegramChannel::parse_message_id("tg_x"), None);
    }

    #[test]
    fn test_convert_group_update() {
        let inbound =
            TelegramChannel::convert_update(text_update("supergroup", Some("Team"), Some("hi")))
                .unwrap();

        assert_eq!(inbound.id, "tg_100");
        assert_eq!(inbound.sender_id, "42");
        assert_eq!(inbound.conversation_id, "-999");
        assert_eq!(inbound.content, "hi");
        assert_eq!(inbound.sender_name.as_deref(), Some("@johndoe"));
        assert_eq!(inbound.conversation_kind, ConversationKind::Group);
        assert_eq!(inbound.conversation_title.as_deref(), Some("Team"));
    }

    #[test]
    fn test_convert_update_no_username() {
        let mut update = text_update("private", None, Some("Hello"));
        if let Some(message) = update.message.as_mut()
            && let Some(from) = message.from.as_mut()
        {
            from.username = None;
        }

        let inbound = TelegramChannel::convert_update(update).unwrap();
        assert_eq!(inbound.sender_name.as_deref(), Some("John Doe"));
        assert_eq!(inbound.conversation_kind, ConversationKind::Private);
    }

    #[test]
    fn test_convert_update_skips_non_text() {
        assert!(TelegramChannel::convert_update(text_update("group", None, None)).is_none());
        assert!(TelegramChannel::convert_update(text_update("group", None, Some("  "))).is_none());
        assert!(
            TelegramChannel::convert_update(TelegramUpdate {
                update_id: 1,
                message: None,
            })
            .is_none()
        );
    }

    #[test]
    fn test_convert_update_forum_thread_conversation_id() {
        let mut update = text_update("supergroup", Some("Forum"), Some("Thread message"));
        if let Some(message) = update.message.as_mut() {
            message.chat.id = -10012345;
            message.message_thread_id = Some(7);
            message.is_topic_message = Some(true);
        }

        let inbound = TelegramChannel::convert_update(update).unwrap();
        assert_eq!(inbound.conversation_id, "-10012345:7");
    }

    #[test]
    fn test_supergroup_reply_stays_in_chat_backlog() {
        let updates: Vec<TelegramUpdate> = serde_json::from_value(serde_json::json!([
            {"update_id": 1, "message": {
                "message_id": 55, "date": 0,
                "from": {"id": 1, "is_bot": false, "first_name": "A"},
                "chat": {"id": -100, "type": "supergroup", "title": "Team"},
                "text": "lunch?"
            }},
            {"update_id": 2, "message": {
                "message_id": 56, "date": 0,
                "from": {"id": 2, "is_bot": false, "first_name": "B"},
                "chat": {"id": -100, "type": "supergroup", "title": "Team"},
                "message_thread_id": 55,
                "reply_to_message": {"message_id": 55, "date": 0,
                    "chat": {"id": -100, "type": "supergroup"}},
                "text": "sure"
            }}
        ]))
        .unwrap();

        let buffer = ConversationBuffer::new();
        for update in updates {
            let inbound = TelegramChannel::convert_update(update).unwrap();
            assert_eq!(inbound.conversation_id, "-100");
            buffer.append(
                &inbound.conversation_id,
                MessageRecord::from_inbound(&inbound).unwrap(),
            );
        }

        let drained = buffer.drain_all("-100");
        let lines: Vec<String> = drained.records.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["A: lunch?", "B: sure"]);
        assert_eq!(buffer.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_send_splits_and_threads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-10012345",
                "message_thread_id": 7,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 1}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let text = format!("{}\n\n{}", "a".repeat(3000), "b".repeat(3000));
        channel_for(&server)
            .send(OutboundMessage::new("-10012345:7", text))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_reports_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot can't initiate conversation with a user"
            })))
            .mount(&server)
            .await;

        let err = channel_for(&server)
            .send_text("42", "summary")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("can't initiate conversation"));
    }

    #[tokio::test]
    async fn test_delete_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/deleteMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-999",
                "message_id": 55,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = channel_for(&server);
        channel.delete_message("-999", "tg_55").await.unwrap();
        assert!(channel.delete_message("-999", "55").await.is_err());
    }

    #[tokio::test]
    async fn test_poll_updates_advances_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {
                        "message_id": 1, "date": 0,
                        "from": {"id": 1, "is_bot": false, "first_name": "A"},
                        "chat": {"id": -5, "type": "group", "title": "G"},
                        "text": "one"
                    }},
                    {"update_id": 11, "edited_message": {}}
                ]
            })))
            .mount(&server)
            .await;

        let channel = channel_for(&server);
        let updates = channel.poll_updates().await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(channel.last_update_id(), 11);
        let converted: Vec<_> = updates
            .into_iter()
            .filter_map(TelegramChannel::convert_update)
            .collect();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].sender_name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_test_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 1, "is_bot": true, "first_name": "Digest", "username": "digest_bot"}
            })))
            .mount(&server)
            .await;

        let me = channel_for(&server).test_connection().await.unwrap();
        assert_eq!(me.username.as_deref(), Some("digest_bot"));
    }
}
