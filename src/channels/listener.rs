//! Inbound event listener.
//!
//! Chat messages are logged and otherwise ignored; the bot has no commands.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::channels::{Channel, MessageStream};

/// Spawn a task that drains `channel`'s inbound stream until it ends or
/// `cancel` fires.
pub fn spawn_event_listener(
    channel: Arc<dyn Channel>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stream = match channel.start().await {
            Ok(s) => s,
            Err(e) => {
                error!(channel = channel.name(), "Failed to start listener: {e}");
                return;
            }
        };

        let handled = drain(stream, &cancel).await;
        info!(channel = channel.name(), handled, "Event listener stopped");

        if let Err(e) = channel.shutdown().await {
            error!(channel = channel.name(), "Channel shutdown failed: {e}");
        }
    })
}

/// Log every message on `stream`. Returns how many were seen.
async fn drain(mut stream: MessageStream, cancel: &CancellationToken) -> usize {
    let mut handled = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = stream.next() => {
                let Some(msg) = next else { break };
                info!(
                    channel = %msg.channel,
                    chat_id = msg.chat_id,
                    sender = %msg.sender,
                    "[{}] {}", msg.sender, msg.content
                );
                handled += 1;
            }
        }
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::IncomingMessage;

    #[tokio::test]
    async fn drain_counts_until_stream_ends() {
        let messages = vec![
            IncomingMessage::new("test", 1, "alice", "hi"),
            IncomingMessage::new("test", 1, "bob", "/add plan"),
        ];
        let stream: MessageStream = Box::pin(futures::stream::iter(messages));

        assert_eq!(drain(stream, &CancellationToken::new()).await, 2);
    }

    #[tokio::test]
    async fn drain_stops_on_cancel() {
        let stream: MessageStream = Box::pin(futures::stream::pending::<IncomingMessage>());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(drain(stream, &cancel).await, 0);
    }
}
