pub mod telegram;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;

/// The message we just sent to the bot.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: i32,
    pub date: DateTime<Utc>,
}

/// A message observed in the conversation with the bot.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i32,
    pub outgoing: bool,
    pub date: DateTime<Utc>,
    /// `None` for media-only or service messages.
    pub text: Option<String>,
}

impl ChatMessage {
    /// Whether this message is the bot answering `sent`.
    fn answers(&self, sent: &SentMessage) -> bool {
        !self.outgoing && self.id > sent.id
    }
}

/// One conversation with a fixed bot on a messaging service.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Send `text` to the bot.
    async fn send(&self, text: &str) -> Result<SentMessage>;

    /// The most recent message in the conversation, if any.
    async fn latest(&self) -> Result<Option<ChatMessage>>;

    /// Called after every round-trip, whatever its outcome.
    async fn release(&self) -> Result<()>;
}

/// Relays queries to the bot one at a time and waits for its answer.
///
/// The underlying account is shared, so concurrent round-trips could read each
/// other's replies. The mutex keeps at most one send/poll cycle in flight.
pub struct BotGateway {
    transport: Arc<dyn BotTransport>,
    poll_interval: Duration,
    reply_window: Duration,
    round_trip_timeout: Duration,
    lock: Mutex<()>,
}

impl BotGateway {
    pub fn new(transport: Arc<dyn BotTransport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            poll_interval: config.poll_interval(),
            reply_window: config.reply_window(),
            round_trip_timeout: config.round_trip_timeout(),
            lock: Mutex::new(()),
        }
    }

    /// Send `query` to the bot and return its text reply.
    ///
    /// `Ok(None)` means the bot did not answer with text in time. Transport
    /// failures are returned as errors; callers treat both the same way.
    pub async fn query(&self, query: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;

        let outcome = tokio::time::timeout(self.round_trip_timeout, self.round_trip(query)).await;

        if let Err(e) = self.transport.release().await {
            warn!("Failed to release bot session: {:#}", e);
        }

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Bot round-trip exceeded {:?}, treating as no reply",
                    self.round_trip_timeout
                );
                Ok(None)
            }
        }
    }

    async fn round_trip(&self, query: &str) -> Result<Option<String>> {
        let sent = self.transport.send(query).await?;
        debug!("Sent query to bot as message {}", sent.id);

        let deadline = Instant::now() + self.reply_window;
        loop {
            tokio::time::sleep(self.poll_interval).await;

            if let Some(message) = self.transport.latest().await? {
                if message.answers(&sent) {
                    let latency = message.date.signed_duration_since(sent.date);
                    info!(
                        "Bot replied with message {} after ~{}s",
                        message.id,
                        latency.num_seconds()
                    );
                    return Ok(message.text.filter(|t| !t.is_empty()));
                }
            }

            if Instant::now() >= deadline {
                info!("No reply from bot within {:?}", self.reply_window);
                return Ok(None);
            }
        }
    }
}
