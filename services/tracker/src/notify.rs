//! Telegram notifications for card authors
//!
//! Delivery is best effort: messages are sent from a detached task, failures
//! are logged and never retried.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    User,
    card::{Card, CardStatus},
    comment::Comment,
};

/// Comments longer than this many characters are cut in notifications
pub const COMMENT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Minimal Telegram Bot API client
#[derive(Clone)]
pub struct TelegramBot {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
}

impl TelegramBot {
    /// Create a new TelegramBot; an empty token turns sending into a no-op
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty()
    }

    /// Send an HTML formatted message to a chat
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        if !self.is_enabled() {
            debug!("Bot token not configured, skipping message to {}", chat_id);
            return Ok(());
        }

        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }

        Ok(())
    }
}

/// Dispatches notifications about activity on a user's cards
#[derive(Clone)]
pub struct Notifier {
    bot: Arc<TelegramBot>,
    app_url: Option<String>,
}

impl Notifier {
    pub fn new(bot: TelegramBot, app_url: Option<String>) -> Self {
        Self {
            bot: Arc::new(bot),
            app_url,
        }
    }

    /// Tell the card author about a new comment. Returns whether a message
    /// was scheduled.
    pub fn notify_new_comment(&self, card: &Card, commenter: &User, comment: &Comment) -> bool {
        if card.user_id == commenter.id {
            return false;
        }

        let text = comment_message(card, commenter, comment, self.app_url.as_deref());
        self.dispatch(card.user_id, text);
        true
    }

    /// Tell the card author about a status change made by someone else
    pub fn notify_status_change(&self, card: &Card, actor_id: i64, status: CardStatus) -> bool {
        if card.user_id == actor_id {
            return false;
        }

        let text = status_message(card, status, self.app_url.as_deref());
        self.dispatch(card.user_id, text);
        true
    }

    fn dispatch(&self, chat_id: i64, text: String) {
        let bot = Arc::clone(&self.bot);
        tokio::spawn(async move {
            if let Err(e) = bot.send_message(chat_id, &text).await {
                warn!("Failed to send notification to user {}: {}", chat_id, e);
            }
        });
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Cut a comment to its first [`COMMENT_PREVIEW_CHARS`] characters
pub fn truncate_comment(content: &str) -> String {
    match content.char_indices().nth(COMMENT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

fn card_link(card: &Card, app_url: Option<&str>) -> String {
    app_url
        .map(|url| format!("\n\n<a href=\"{}/c/{}\">Open card</a>", escape_html(url), card.id))
        .unwrap_or_default()
}

pub fn comment_message(
    card: &Card,
    commenter: &User,
    comment: &Comment,
    app_url: Option<&str>,
) -> String {
    let content = if comment.content.is_empty() {
        "[image]".to_string()
    } else {
        escape_html(&truncate_comment(&comment.content))
    };

    format!(
        "💬 <b>New comment on your card</b>\n\n\"{}\"\n\n<b>{}</b>: {}{}",
        escape_html(&card.title),
        escape_html(&commenter.display_name()),
        content,
        card_link(card, app_url),
    )
}

pub fn status_message(card: &Card, status: CardStatus, app_url: Option<&str>) -> String {
    format!(
        "📋 <b>Your card status changed</b>\n\n\"{}\"\n\nNew status: <b>{}</b>{}",
        escape_html(&card.title),
        status.label(),
        card_link(card, app_url),
    )
}
