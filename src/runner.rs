use crate::bot::handlers::{self, is_url_candidate, Command};
use crate::config::Settings;
use crate::relay::{Relay, RelayBuildError};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the Telegram dispatcher until Ctrl-C.
///
/// Updates from different chats are handled concurrently; updates from one
/// chat are handled in arrival order.
///
/// # Errors
///
/// Returns [`RelayBuildError`] if the relay's HTTP client cannot be built.
pub async fn run_bot(settings: Arc<Settings>) -> Result<(), RelayBuildError> {
    let relay = Arc::new(Relay::new(settings.relay_config())?);
    info!(
        library = %settings.storage_zone_name,
        upload_url = %relay.config().upload_url(),
        "Relay initialized."
    );

    let bot = Bot::new(settings.bot_api_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(is_url_candidate))
                .endpoint(handle_video_url),
        )
        .branch(dptree::endpoint(handle_unknown))
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Help => handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_video_url(
    bot: Bot,
    msg: Message,
    relay: Arc<Relay>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_video_url(bot, msg, relay).await {
        error!("Video URL handler error: {}", e);
    }
    respond(())
}

async fn handle_unknown(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_unknown(bot, msg).await {
        error!("Fallback handler error: {}", e);
    }
    respond(())
}
