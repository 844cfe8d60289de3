//! Scripted transport for gateway and HTTP tests.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::{BotTransport, ChatMessage, SentMessage};

#[derive(Default)]
struct MockState {
    sent: Vec<String>,
    last_sent_id: i32,
    polls_since_send: usize,
    total_polls: usize,
    releases: usize,
    in_flight: bool,
    overlapped: bool,
}

pub struct MockTransport {
    reply: Option<String>,
    reply_after_polls: usize,
    stall: Option<Duration>,
    fail: bool,
    state: Mutex<MockState>,
}

impl MockTransport {
    fn new(reply: Option<String>) -> Self {
        Self {
            reply,
            reply_after_polls: 0,
            stall: None,
            fail: false,
            state: Mutex::new(MockState::default()),
        }
    }

    /// The bot answers every query with `text`. An empty string stands for a
    /// media-only answer.
    pub fn replying(text: &str) -> Self {
        Self::new(Some(text.to_string()))
    }

    /// The bot never answers.
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Every send fails at the transport level.
    pub fn failing() -> Self {
        let mut transport = Self::new(None);
        transport.fail = true;
        transport
    }

    pub fn after_polls(mut self, polls: usize) -> Self {
        self.reply_after_polls = polls;
        self
    }

    /// Every `latest()` call hangs for `delay` first.
    pub fn stalling(mut self, delay: Duration) -> Self {
        self.stall = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn polls(&self) -> usize {
        self.state.lock().unwrap().total_polls
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    pub fn overlapped(&self) -> bool {
        self.state.lock().unwrap().overlapped
    }
}

#[async_trait]
impl BotTransport for MockTransport {
    async fn send(&self, text: &str) -> Result<SentMessage> {
        let mut state = self.state.lock().unwrap();
        if state.in_flight {
            state.overlapped = true;
        }
        state.in_flight = true;
        if self.fail {
            anyhow::bail!("connection reset by peer");
        }
        state.sent.push(text.to_string());
        state.last_sent_id += 2;
        state.polls_since_send = 0;
        Ok(SentMessage {
            id: state.last_sent_id,
            date: Utc::now(),
        })
    }

    async fn latest(&self) -> Result<Option<ChatMessage>> {
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.polls_since_send += 1;
        state.total_polls += 1;

        let message = match &self.reply {
            Some(text) if state.polls_since_send > self.reply_after_polls => ChatMessage {
                id: state.last_sent_id + 1,
                outgoing: false,
                date: Utc::now(),
                text: (!text.is_empty()).then(|| text.clone()),
            },
            _ => ChatMessage {
                id: state.last_sent_id,
                outgoing: true,
                date: Utc::now(),
                text: state.sent.last().cloned(),
            },
        };
        Ok(Some(message))
    }

    async fn release(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.in_flight = false;
        state.releases += 1;
        Ok(())
    }
}
