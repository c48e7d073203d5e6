// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for keydesk.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for messages and inline-button callbacks, outbound text
//! with optional photo and inline keyboards. Delivery is at-most-once and
//! best-effort; the broker never waits for an acknowledgement.

pub mod handler;

use std::path::PathBuf;

use async_trait::async_trait;
use keydesk_config::model::TelegramConfig;
use keydesk_core::channel::ChannelAdapter;
use keydesk_core::error::KeydeskError;
use keydesk_core::types::{
    Button, ChannelCapabilities, HealthStatus, InboundEvent, MessageId, OutboundMessage,
};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Connects via long polling, filters updates to private chats, and
/// converts them into channel-agnostic events.
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, KeydeskError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            KeydeskError::Config("telegram.bot_token is required for the Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(KeydeskError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            supports_buttons: true,
            max_message_length: Some(4096),
        }
    }

    async fn connect(&mut self) -> Result<(), KeydeskError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let msg_tx = self.inbound_tx.clone();
        let cb_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let tree = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = msg_tx.clone();
                    async move {
                        // DMs only; the broker has no group semantics.
                        if !handler::is_dm(&msg) {
                            debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                            return respond(());
                        }
                        if let Some(event) = handler::message_to_event(&msg)
                            && tx.send(event).await.is_err()
                        {
                            warn!("inbound queue closed, dropping message");
                        }
                        respond(())
                    }
                }))
                .branch(Update::filter_callback_query().endpoint(
                    move |bot: Bot, query: CallbackQuery| {
                        let tx = cb_tx.clone();
                        async move {
                            // Dismiss the button spinner; best-effort.
                            if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
                                debug!(error = %e, "failed to answer callback query");
                            }
                            if let Some(event) = handler::callback_to_event(&query)
                                && tx.send(event).await.is_err()
                            {
                                warn!("inbound queue closed, dropping callback");
                            }
                            respond(())
                        }
                    },
                ));

            Dispatcher::builder(bot, tree)
                .default_handler(|_| async {}) // Silently ignore other update kinds
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KeydeskError> {
        let chat = Recipient::Id(ChatId(msg.recipient.0));
        let markup = (!msg.buttons.is_empty()).then(|| markup_from(&msg.buttons));

        let sent = if let Some(image) = &msg.image {
            // Try the photo first; fall back to plain text when the image
            // reference is unreadable so the content still gets through.
            let mut request = self
                .bot
                .send_photo(chat.clone(), InputFile::file(PathBuf::from(image)))
                .caption(msg.text.clone());
            if let Some(m) = markup.clone() {
                request = request.reply_markup(m);
            }
            match request.await {
                Ok(sent) => sent,
                Err(e) => {
                    warn!(error = %e, image, "photo send failed, sending as text");
                    let mut request = self.bot.send_message(chat, msg.text.clone());
                    if let Some(m) = markup {
                        request = request.reply_markup(m);
                    }
                    request.await.map_err(|e| KeydeskError::Channel {
                        message: format!("failed to send message: {e}"),
                        source: Some(Box::new(e)),
                    })?
                }
            }
        } else {
            let mut request = self.bot.send_message(chat, msg.text.clone());
            if let Some(m) = markup {
                request = request.reply_markup(m);
            }
            request.await.map_err(|e| KeydeskError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundEvent, KeydeskError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| KeydeskError::channel("Telegram inbound queue closed"))
    }

    async fn health_check(&self) -> Result<HealthStatus, KeydeskError> {
        // Check that the bot token is valid by calling getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KeydeskError> {
        debug!("Telegram channel shutting down");
        // The polling handle is aborted when TelegramChannel is dropped. For
        // a graceful shutdown the serve loop stops calling receive() first.
        Ok(())
    }
}

/// Renders broker button rows as a Telegram inline keyboard.
fn markup_from(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}
