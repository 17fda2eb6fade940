//! Telegram Bot host
//!
//! Routes `/ep_*` commands from Telegram into the [`CommandPipeline`] and
//! delivers the reply: a photo with caption when the pipeline produced an
//! image, a plain message otherwise.
//!
//! Uses explicit Dispatcher pattern for reliable message polling.

use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{BotCommand, ChatAction, InputFile, Update},
};

use crate::command::Command;
use crate::config::Config;
use crate::pipeline::CommandPipeline;
use crate::reply::Reply;

/// Telegram caps photo captions at 1024 characters
const CAPTION_LIMIT: usize = 1024;

struct BotData {
    config: Config,
    pipeline: CommandPipeline,
    /// Our own username, to skip `/cmd@otherbot` in groups
    username: Option<String>,
}

/// Run Telegram bot with explicit Dispatcher for reliable polling
pub async fn run_telegram_bot(config: Config) -> Result<()> {
    let token = std::env::var("TELOXIDE_TOKEN")
        .or_else(|_| std::env::var("TELEGRAM_BOT_TOKEN"))
        .context("TELOXIDE_TOKEN or TELEGRAM_BOT_TOKEN must be set")?;

    tracing::info!("===========================================");
    tracing::info!("  EPorner Bot - Starting...");
    tracing::info!("===========================================");
    tracing::info!(
        "Allowed users: {}",
        if config.allowed_users.is_empty() {
            "ALL".to_string()
        } else {
            format!("{:?}", config.allowed_users)
        }
    );
    tracing::info!("Cache directory: {:?}", config.cache_dir);

    let bot = Bot::new(token);

    tracing::info!("Verifying bot token...");
    let username = match bot.get_me().await {
        Ok(me) => {
            tracing::info!(
                "Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
            me.username.clone()
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    };

    // Delete any existing webhook to ensure polling works
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    if let Err(e) = bot.set_my_commands(command_menu()).await {
        tracing::warn!("Failed to register command menu: {}", e);
    }

    let pipeline = CommandPipeline::from_config(&config).await;
    let handler_data = Arc::new(BotData {
        config,
        pipeline,
        username,
    });

    let handler = Update::filter_message().endpoint(message_handler);

    tracing::info!("Starting dispatcher with long polling...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&handler_data)])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in message handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::warn!("Dispatcher stopped");
    handler_data.pipeline.shutdown().await;
    Ok(())
}

fn command_menu() -> Vec<BotCommand> {
    vec![
        BotCommand::new("ep_video", "视频信息: /ep_video <视频ID或链接>"),
        BotCommand::new("ep_search", "搜索视频: /ep_search <关键词>"),
        BotCommand::new("ep_pornstar", "演员信息: /ep_pornstar <演员ID>"),
        BotCommand::new("ep_category", "分类视频: /ep_category <分类名>"),
        BotCommand::new("help", "帮助"),
    ]
}

/// Message handler endpoint for the dispatcher
async fn message_handler(bot: Bot, msg: Message, data: Arc<BotData>) -> ResponseResult<()> {
    let Some(command) = msg
        .text()
        .and_then(|text| Command::parse(text, data.username.as_deref()))
    else {
        return Ok(());
    };

    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id;

    if !data.config.is_allowed(user_id) {
        tracing::warn!("Unauthorized user: {}", user_id);
        bot.send_message(chat_id, "Unauthorized.").await?;
        return Ok(());
    }

    tracing::info!(
        ">>> Command received: user={}, chat={}, command=/{}",
        user_id,
        chat_id.0,
        command.name()
    );

    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
        tracing::debug!("Typing indicator failed: {}", e);
    }

    let sender = bot.clone();
    data.pipeline
        .run_and_emit(&command, move |reply| async move {
            send_reply(&sender, chat_id, reply).await
        })
        .await
}

/// Deliver a pipeline reply; a rejected photo falls back to the text alone
async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    match reply {
        Reply::Text(text) => {
            bot.send_message(chat_id, text).await?;
        }
        Reply::ImageText { image, text } => {
            let fits_caption = text.chars().count() <= CAPTION_LIMIT;
            let mut request = bot.send_photo(chat_id, InputFile::file(image));
            if fits_caption {
                request = request.caption(text.clone());
            }

            match request.await {
                Ok(_) if fits_caption => {}
                Ok(_) => {
                    bot.send_message(chat_id, text).await?;
                }
                Err(e) => {
                    tracing::warn!("Failed to send photo: {}, sending text only", e);
                    bot.send_message(chat_id, text).await?;
                }
            }
        }
    }
    Ok(())
}
