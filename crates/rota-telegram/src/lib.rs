//! Telegram adapter (teloxide).
//!
//! This crate implements the `rota-core` messaging ports over the Telegram
//! Bot API: outbound sends with the fixed reply keyboard, and the 60 s
//! long-poll update feed the dispatch loop consumes.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, ReplyMarkup},
};

use tokio::time::sleep;

pub mod listener;

use rota_core::{
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{OutboundMessage, ReplyKeyboard},
    },
    Result,
};

pub use listener::TelegramUpdateSource;

/// Build both halves of the transport from one bot token. The returned
/// handles share the underlying API client; lifecycle is the caller's.
pub fn connect(token: &str) -> (TelegramMessenger, TelegramUpdateSource) {
    let bot = Bot::new(token);
    (
        TelegramMessenger::new(bot.clone()),
        TelegramUpdateSource::new(bot),
    )
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat: rota_core::domain::ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat.0)
    }

    fn reply_markup(keyboard: &ReplyKeyboard) -> ReplyMarkup {
        let rows: Vec<Vec<KeyboardButton>> = keyboard
            .rows
            .iter()
            .map(|row| row.iter().cloned().map(KeyboardButton::new).collect())
            .collect();
        ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard(true))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::TransportSend(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        self.with_retry(|| {
            let mut req = self
                .bot
                .send_message(Self::tg_chat(message.chat), message.text.clone());
            if let Some(keyboard) = &message.keyboard {
                req = req.reply_markup(Self::reply_markup(keyboard));
            }
            req
        })
        .await?;
        Ok(())
    }
}
