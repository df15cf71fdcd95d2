//! Long-running workers: the redemption queue and the alliance monitor.
//!
//! Workers report to Discord through [`ChannelSink`] so they can be driven
//! without a gateway connection.

pub mod monitor;
pub mod redemption;

use crate::errors::{Error, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::warn;

/// A message for a channel, independent of the Discord API types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Announcement {
    /// Embed title
    pub title: String,
    /// Embed body
    pub description: String,
    /// Sidebar color
    pub color: u32,
    /// `(name, value, inline)`
    pub fields: Vec<(String, String, bool)>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Footer text
    pub footer: Option<String>,
}

impl Announcement {
    /// Builds the Discord embed.
    #[must_use]
    pub fn to_embed(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .color(self.color)
            .fields(self.fields.clone())
            .timestamp(serenity::Timestamp::now());
        if let Some(url) = &self.thumbnail {
            embed = embed.thumbnail(url);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
        }
        embed
    }
}

/// Somewhere workers can post announcements.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    /// Posts `announcement` to the channel with id `channel_id`.
    async fn post(&self, channel_id: &str, announcement: Announcement) -> Result<()>;
}

/// Posts announcements through the Discord REST API.
pub struct DiscordSink {
    http: Arc<serenity::Http>,
}

impl DiscordSink {
    /// Wraps the client's HTTP handle.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelSink for DiscordSink {
    async fn post(&self, channel_id: &str, announcement: Announcement) -> Result<()> {
        let id: u64 = channel_id
            .parse()
            .map_err(|_| Error::validation(format!("Invalid channel id '{channel_id}'")))?;
        let message = serenity::CreateMessage::new().embed(announcement.to_embed());
        if let Err(e) = serenity::ChannelId::new(id)
            .send_message(&self.http, message)
            .await
        {
            warn!("Failed to post to channel {channel_id}: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}
