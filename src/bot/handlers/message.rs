//! Reactions to player ids posted in chat.
//!
//! When a message contains a 9-digit token, the bot reacts with ✅ if that
//! player is on a roster and ❌ otherwise.

use crate::{
    bot::BotData,
    core::member,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)] // The pattern is a literal
static PLAYER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{9}\b").expect("player id pattern is valid"));

/// The first standalone 9-digit token of a message.
#[must_use]
pub fn first_player_id(content: &str) -> Option<&str> {
    PLAYER_ID.find(content).map(|m| m.as_str())
}

/// Framework event hook. Only new messages are handled.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::Message { new_message } = event {
        react_to_player_id(ctx, new_message, data).await?;
    }
    Ok(())
}

async fn react_to_player_id(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }
    let Some(fid) = first_player_id(&message.content) else {
        return Ok(());
    };

    let known = member::member_exists(&data.database, fid).await?;
    debug!("Player id {fid} in message {}: member={known}", message.id);
    let reaction = if known { '✅' } else { '❌' };
    message.react(ctx, reaction).await?;
    Ok(())
}
