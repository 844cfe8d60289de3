use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use grammers_client::types::PackedChat;
use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use tracing::info;

use super::{BotTransport, ChatMessage, SentMessage};
use crate::config::Config;

/// Talks to the bot from a regular Telegram user account over MTProto.
///
/// Bots cannot message other bots through the Bot API, so the lookup has to
/// come from a logged-in user session.
pub struct TelegramTransport {
    client: Client,
    bot: PackedChat,
    session_file: PathBuf,
}

impl TelegramTransport {
    /// Connect, authorize if needed and resolve the bot.
    ///
    /// An unauthorized session is only signed in when `interactive` is set and
    /// stdin is a terminal; otherwise startup fails.
    pub async fn connect(config: &Config, interactive: bool) -> Result<Self> {
        let telegram = &config.telegram;
        let api_id = telegram
            .api_id
            .context("telegram api_id is not configured")?;

        let session = Session::load_file_or_create(&telegram.session_file).with_context(|| {
            format!(
                "Failed to open session file: {}",
                telegram.session_file.display()
            )
        })?;

        info!("Connecting to Telegram as {}", telegram.phone_number);
        let client = Client::connect(ClientConfig {
            session,
            api_id,
            api_hash: telegram.api_hash.clone(),
            params: InitParams {
                catch_up: false,
                ..Default::default()
            },
        })
        .await
        .context("Failed to connect to Telegram")?;

        let authorized = client
            .is_authorized()
            .await
            .context("Failed to check Telegram authorization")?;

        if !authorized {
            if !interactive || !io::stdin().is_terminal() {
                anyhow::bail!(
                    "Telegram session {} is not authorized; run once with --login from a terminal",
                    telegram.session_file.display()
                );
            }
            sign_in(&client, &telegram.phone_number).await?;
            client
                .session()
                .save_to_file(&telegram.session_file)
                .context("Failed to save Telegram session")?;
            info!("Telegram session saved to {}", telegram.session_file.display());
        }

        let username = config.bot_username();
        let bot = client
            .resolve_username(username)
            .await
            .with_context(|| format!("Failed to resolve @{}", username))?
            .with_context(|| format!("Bot @{} not found", username))?;
        info!("Resolved bot @{}", username);

        Ok(Self {
            client,
            bot: bot.pack(),
            session_file: telegram.session_file.clone(),
        })
    }
}

async fn sign_in(client: &Client, phone: &str) -> Result<()> {
    let token = client
        .request_login_code(phone)
        .await
        .context("Failed to request login code")?;
    let code = prompt("Enter the code Telegram sent you: ")?;

    match client.sign_in(&token, &code).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&format!("Two-step password (hint: {}): ", hint))?;
            client
                .check_password(password_token, password.trim())
                .await
                .context("Two-step password rejected")?;
        }
        Err(e) => return Err(e).context("Telegram sign-in failed"),
    }

    info!("Signed in to Telegram");
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

#[async_trait]
impl BotTransport for TelegramTransport {
    async fn send(&self, text: &str) -> Result<SentMessage> {
        let message = self
            .client
            .send_message(self.bot, text)
            .await
            .context("Failed to send message to bot")?;
        Ok(SentMessage {
            id: message.id(),
            date: message.date(),
        })
    }

    async fn latest(&self) -> Result<Option<ChatMessage>> {
        let mut history = self.client.iter_messages(self.bot).limit(1);
        let message = history
            .next()
            .await
            .context("Failed to read bot conversation")?;

        Ok(message.map(|m| {
            let text = m.text();
            ChatMessage {
                id: m.id(),
                outgoing: m.outgoing(),
                date: m.date(),
                text: (!text.is_empty()).then(|| text.to_string()),
            }
        }))
    }

    async fn release(&self) -> Result<()> {
        self.client
            .session()
            .save_to_file(&self.session_file)
            .with_context(|| {
                format!(
                    "Could not persist Telegram session to {}",
                    self.session_file.display()
                )
            })
    }
}
