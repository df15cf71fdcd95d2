//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Bot administrator commands
pub mod admin;

/// Alliance and roster commands
pub mod alliance;

/// Event guide and timeline commands
pub mod event;

/// General utility commands
pub mod general;

/// Gift code commands
pub mod giftcode;

/// Alliance monitor commands
pub mod monitor;

/// Voice playback commands
pub mod music;

/// Player lookup command
pub mod player;

/// Web search and language model commands
pub mod search;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        general::ping(),
        general::help(),
        alliance::alliance(),
        admin::admin(),
        giftcode::giftcode(),
        player::playerinfo(),
        event::event(),
        event::serverage(),
        event::timeline(),
        monitor::monitor(),
        search::search(),
        search::ask(),
        search::llmstats(),
        music::play(),
        music::skip(),
        music::pause(),
        music::resume(),
        music::stop(),
        music::queue(),
        music::nowplaying(),
        music::leave(),
    ]
}
