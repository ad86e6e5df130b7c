//! Channel traits and the inbound message type.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// Stream of inbound messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a chat.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel that received it ("telegram", "cli").
    pub channel: String,
    pub chat_id: i64,
    pub sender: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, chat_id: i64, sender: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id,
            sender: sender.to_string(),
            content: content.to_string(),
            received_at: Utc::now(),
        }
    }
}

/// Outbound port: delivers a text message to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChannelError>;
}

/// A chat transport: outbound notifications plus an inbound event stream.
#[async_trait]
pub trait Channel: Notifier {
    fn name(&self) -> &str;

    /// Begin listening. Messages arrive on the returned stream until the
    /// transport stops.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
