//! # Telegram Notifications
//!
//! This module pushes run status messages to a Telegram chat through the
//! Bot API. The warehouse team watches that chat; a fetch that breaks
//! overnight is first seen here, long before anyone reads the logs.
//!
//! ## Features
//!
//! - **Plain-text status messages**: run started, run finished, run failed
//! - **Optional integration**: gracefully disables if credentials are not configured
//! - **Graceful degradation**: delivery problems are logged, never fatal to a run
//!
//! ## Message Flow
//!
//! Each message is one `sendMessage` call:
//! - **Endpoint**: `https://api.telegram.org/bot{token}/sendMessage`
//! - **Payload**: JSON body with `chat_id` and `text`
//! - **Rate Limits**: Telegram allows ~30 messages/second per bot; this
//!   bot sends a handful per run, far below any limit
//!
//! ## Environment Configuration
//!
//! Set `TELEGRAM_BOT_TOKEN` (from `@BotFather`) and `TELEGRAM_CHAT_ID`
//! (the target chat or channel id). If either is missing, notifications
//! are disabled but logged.

use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::TelegramMessage;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API client for run notifications.
///
/// Encapsulates the HTTP client and the bot credentials loaded from the
/// environment. When unconfigured it stays inert: every send becomes a
/// no-op so the fetcher behaves identically with or without Telegram.
///
/// ## Thread Safety
///
/// This struct is `Clone` and can be shared across async tasks. The
/// underlying `reqwest::Client` is designed for concurrent use.
pub struct TelegramNotifier {
    /// Reusable HTTP client for Bot API requests.
    client: Client,

    /// Bot API origin; constant in production, overridable in tests.
    api_base: String,

    /// Bot token and chat id; `None` disables the notifier.
    credentials: Option<BotCredentials>,
}

#[derive(Clone)]
struct BotCredentials {
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Creates a notifier from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    ///
    /// Missing credentials are not an error; the notifier is returned
    /// disabled and each send is skipped, so the fetcher runs unchanged on
    /// machines without Telegram access.
    pub fn new() -> Self {
        let client = Client::new();
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();

        let credentials = match (token, chat_id) {
            (Some(token), Some(chat_id)) => Some(BotCredentials { token, chat_id }),
            _ => {
                warn!(
                    "TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set - Telegram notifications will be disabled"
                );
                None
            }
        };

        Self {
            client,
            api_base: API_BASE.to_string(),
            credentials,
        }
    }

    #[cfg(test)]
    fn with_endpoint(api_base: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.to_string(),
            credentials: Some(BotCredentials {
                token: token.to_string(),
                chat_id: chat_id.to_string(),
            }),
        }
    }

    /// Sends one plain-text message to the configured chat.
    ///
    /// Returns immediately when Telegram is disabled. Every delivery
    /// problem - a non-success status from the Bot API as much as a
    /// transport failure - is logged and swallowed, so a notification can
    /// never take a fetch run down with it.
    pub async fn send_message(&self, text: &str) {
        let Some(credentials) = &self.credentials else {
            return;
        };

        let message = TelegramMessage {
            chat_id: credentials.chat_id.clone(),
            text: text.to_string(),
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, credentials.token);
        match self.client.post(&url).json(&message).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Telegram notification sent");
            }
            Ok(response) => {
                error!("Failed to send Telegram notification: {}", response.status());
            }
            Err(e) => {
                warn!("Could not deliver Telegram notification: {}", e);
            }
        }
    }
}

/// Manual implementation of `Clone` for `TelegramNotifier`.
///
/// The `reqwest::Client` uses `Arc` internally, so clones share the same
/// connection pool; nothing network-side is duplicated.
impl Clone for TelegramNotifier {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_base: self.api_base.clone(),
            credentials: self.credentials.clone(),
        }
    }
}
