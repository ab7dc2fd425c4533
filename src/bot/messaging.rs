//! Common messaging utilities for Telegram bot.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

/// Send a pre-escaped HTML reply.
///
/// # Errors
///
/// Returns an error if the Telegram API call fails.
pub async fn send_html(bot: &Bot, chat_id: ChatId, text: impl Into<String>) -> Result<Message> {
    let sent = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(sent)
}
