//! Telegram channel — sends digests and long-polls the Bot API for updates.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::channels::{Channel, IncomingMessage, MessageStream, Notifier};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram channel — talks to the Bot API over HTTPS.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        check_user_allowed(&self.allowed_users, [username])
    }

    /// Send a plain-text message, split at Telegram's length limit.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_message_chunk(chat_id, &chunk).await?;
        }
        Ok(())
    }

    async fn send_message_chunk(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        self.send_message(chat_id, text).await?;
        tracing::info!(chat_id, "Telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(poll_updates(client, url, allowed_users, tx));

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Long-poll getUpdates and forward allowed text messages to `tx`.
///
/// Returns once the receiving side is dropped, even mid-poll.
async fn poll_updates(
    client: reqwest::Client,
    url: String,
    allowed_users: Vec<String>,
    tx: UnboundedSender<IncomingMessage>,
) {
    let mut offset: i64 = 0;

    tracing::info!("Telegram channel listening for messages...");

    loop {
        tokio::select! {
            biased;
            _ = tx.closed() => break,
            open = poll_once(&client, &url, &mut offset, &allowed_users, &tx) => {
                if !open {
                    break;
                }
            }
        }
    }

    tracing::info!("Telegram listener channel closed");
}

/// One getUpdates round trip. Returns `false` once `tx` has no receiver.
async fn poll_once(
    client: &reqwest::Client,
    url: &str,
    offset: &mut i64,
    allowed_users: &[String],
    tx: &UnboundedSender<IncomingMessage>,
) -> bool {
    let body = serde_json::json!({
        "offset": *offset,
        "timeout": POLL_TIMEOUT_SECS,
        "allowed_updates": ["message"]
    });

    let resp = match client.post(url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Telegram poll error: {e}");
            tokio::time::sleep(POLL_RETRY_DELAY).await;
            return true;
        }
    };

    let data: serde_json::Value = match resp.json().await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("Telegram parse error: {e}");
            tokio::time::sleep(POLL_RETRY_DELAY).await;
            return true;
        }
    };

    let Some(results) = data.get("result").and_then(serde_json::Value::as_array) else {
        tracing::warn!("Telegram getUpdates returned no result: {data}");
        tokio::time::sleep(POLL_RETRY_DELAY).await;
        return true;
    };

    for update in results {
        // Advance offset past this update
        if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64) {
            *offset = uid + 1;
        }

        let Some(incoming) = parse_update(update, allowed_users) else {
            continue;
        };

        if tx.send(incoming).is_err() {
            return false;
        }
    }

    true
}

fn api_url(bot_token: &str, method: &str) -> String {
    format!("https://api.telegram.org/bot{bot_token}/{method}")
}

/// Turn one getUpdates entry into an inbound message.
///
/// Returns `None` for non-text updates and for senders outside the allowlist.
fn parse_update(update: &serde_json::Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;

    let from = message.get("from");
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");
    let user_id = from
        .and_then(|f| f.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string());

    // Check allowlist against both username and numeric ID
    let mut identities = vec![username];
    if let Some(ref id) = user_id {
        identities.push(id.as_str());
    }
    if !check_user_allowed(allowed_users, identities) {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: username={username}, user_id={}",
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or_default();

    Some(IncomingMessage::new("telegram", chat_id, username, text))
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        let window = &remaining[..cut];

        let (chunk, rest) = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(pos) if pos > 0 => (&remaining[..pos], &remaining[pos + 1..]),
            _ => (window, &remaining[cut..]),
        };

        chunks.push(chunk.to_string());
        remaining = rest;
    }

    chunks
}
