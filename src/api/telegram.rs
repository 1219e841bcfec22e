use super::Notifier;
use crate::config::Settings;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Telegram client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// `Ok(None)` unless both token and chat id are set
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        if !settings.telegram_configured() {
            return Ok(None);
        }
        match (
            settings.telegram_bot_token.as_deref(),
            settings.telegram_chat_id.as_deref(),
        ) {
            (Some(token), Some(chat_id)) => Self::new(
                &settings.telegram_api_base,
                token,
                chat_id,
                settings.telegram_timeout(),
            )
            .map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::DeliveryFailed(format!("Failed to send Telegram alert: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::DeliveryFailed(format!("Telegram API error: {}", body)));
        }

        tracing::info!("Telegram alert sent successfully");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when Telegram is not configured; alerts only reach the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        tracing::info!("[ALERT DISABLED] {}", text);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}
