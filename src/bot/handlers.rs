//! Command, URL and fallback handlers for incoming messages.

use crate::bot::messaging::send_html;
use crate::bot::views;
use crate::relay::Relay;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show the command list
    #[command(description = "Show this help.")]
    Help,
}

/// Whether a text message should be handed to the relay.
///
/// Accepts a single whitespace-free token containing `://`. The scheme is not
/// checked here; the relay reports malformed URLs itself.
///
/// # Examples
///
/// ```
/// use stream_relay_bot::bot::handlers::is_url_candidate;
///
/// assert!(is_url_candidate("https://cdn.example.com/clip.mp4"));
/// assert!(!is_url_candidate("hello there"));
/// ```
#[must_use]
pub fn is_url_candidate(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.contains("://") && !trimmed.chars().any(char::is_whitespace)
}

/// Send the greeting
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    send_html(&bot, msg.chat.id, views::GREETING).await?;
    Ok(())
}

/// Send the command list
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    let text = views::help_text(&Command::descriptions().to_string());
    send_html(&bot, msg.chat.id, text).await?;
    Ok(())
}

/// Relay the URL in `msg` and report the outcome.
///
/// Sends an acknowledgment first; a failed acknowledgment is logged and does
/// not prevent the relay or its outcome reply.
///
/// # Errors
///
/// Returns an error if the outcome reply cannot be sent.
pub async fn handle_video_url(bot: Bot, msg: Message, relay: Arc<Relay>) -> Result<()> {
    let source_url = msg.text().unwrap_or_default().trim().to_string();
    let user_id = get_user_id_safe(&msg);
    info!(user_id, source_url = %source_url, "Relay requested");

    if let Err(e) = send_html(&bot, msg.chat.id, views::upload_started(&source_url)).await {
        warn!(user_id, error = %e, "Failed to send acknowledgment");
    }

    let outcome = relay.relay(&source_url).await;
    info!(user_id, success = outcome.is_success(), "Relay finished");

    send_html(&bot, msg.chat.id, views::render_outcome(&outcome)).await?;
    Ok(())
}

/// Fallback for anything that is not a command or URL
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_unknown(bot: Bot, msg: Message) -> Result<()> {
    send_html(&bot, msg.chat.id, views::CANNOT_PROCESS).await?;
    Ok(())
}
