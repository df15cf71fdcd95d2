//! Voice commands - a per-server queue played through songbird.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::Context,
        errors::{Error, Result},
        music::{self, PROGRESS_WIDTH, TrackInfo},
    };
    use poise::serenity_prelude as serenity;
    use songbird::input::{Compose, YoutubeDl};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{info, warn};

    type CallRef = Arc<Mutex<songbird::Call>>;

    fn voice_error(message: &str) -> Error {
        Error::Voice {
            message: message.to_string(),
        }
    }

    async fn manager(ctx: Context<'_>) -> Result<Arc<songbird::Songbird>> {
        songbird::get(ctx.serenity_context())
            .await
            .ok_or_else(|| voice_error("Voice is not available"))
    }

    /// Joins the caller's voice channel.
    async fn join_author(ctx: Context<'_>) -> Result<CallRef> {
        let (guild_id, channel_id) = {
            let guild = ctx
                .guild()
                .ok_or_else(|| voice_error("This command can only be used in a server"))?;
            let channel_id = guild
                .voice_states
                .get(&ctx.author().id)
                .and_then(|state| state.channel_id)
                .ok_or_else(|| voice_error("Join a voice channel first"))?;
            (guild.id, channel_id)
        };

        info!("Joining voice channel {channel_id} in {guild_id}");
        let call = manager(ctx).await?.join(guild_id, channel_id).await?;
        Ok(call)
    }

    /// The call the bot is already in.
    async fn current_call(ctx: Context<'_>) -> Result<CallRef> {
        let guild_id = ctx
            .guild_id()
            .ok_or_else(|| voice_error("This command can only be used in a server"))?;
        manager(ctx)
            .await?
            .get(guild_id)
            .ok_or_else(|| voice_error("I'm not in a voice channel"))
    }

    fn guild_key(ctx: Context<'_>) -> String {
        ctx.guild_id().map(|id| id.to_string()).unwrap_or_default()
    }

    /// Metadata of every track in the call's queue, current track first.
    async fn queued_tracks(ctx: Context<'_>, call: &CallRef) -> Vec<TrackInfo> {
        let ids: Vec<String> = call
            .lock()
            .await
            .queue()
            .current_queue()
            .iter()
            .map(|handle| handle.uuid().to_string())
            .collect();
        let guild = guild_key(ctx);
        let registry = &ctx.data().tracks;
        registry.retain(&guild, &ids).await;
        registry.lookup(&guild, &ids).await
    }

    /// Plays a link, or the first search result for the query.
    #[poise::command(slash_command, guild_only)]
    pub async fn play(
        ctx: Context<'_>,
        #[description = "Link or search terms"] query: String,
    ) -> Result<()> {
        if query.trim().is_empty() {
            return Err(voice_error("Tell me what to play"));
        }
        ctx.defer().await?;
        let call = join_author(ctx).await?;

        let http = ctx.data().http.clone();
        let mut source = if music::is_url(&query) {
            YoutubeDl::new(http, query.trim().to_string())
        } else {
            YoutubeDl::new_search(http, query.trim().to_string())
        };
        let info = match source.aux_metadata().await {
            Ok(meta) => TrackInfo::from(meta),
            Err(e) => {
                warn!("No metadata for '{query}': {e}");
                TrackInfo {
                    title: Some(query.clone()),
                    ..TrackInfo::default()
                }
            }
        };

        let (handle, position) = {
            let mut call = call.lock().await;
            let handle = call.enqueue_input(source.into()).await;
            (handle, call.queue().len())
        };
        ctx.data()
            .tracks
            .insert(&guild_key(ctx), handle.uuid().to_string(), info.clone())
            .await;

        let mut embed = serenity::CreateEmbed::default()
            .title(if position <= 1 {
                "🎶 Now playing"
            } else {
                "➕ Added to queue"
            })
            .description(info.to_string())
            .color(0x0034_98DB);
        if position > 1 {
            embed = embed.field("Position", (position - 1).to_string(), true);
        }
        if let Some(thumbnail) = &info.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Skips the current track.
    #[poise::command(slash_command, guild_only)]
    pub async fn skip(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        let tracks = queued_tracks(ctx, &call).await;
        let Some(current) = tracks.first() else {
            return Err(voice_error("Nothing is playing"));
        };

        call.lock()
            .await
            .queue()
            .skip()
            .map_err(|e| voice_error(&format!("Could not skip: {e}")))?;
        ctx.say(format!(
            "⏭️ Skipped **{}**",
            current.title.as_deref().unwrap_or("the current track")
        ))
        .await?;
        Ok(())
    }

    /// Pauses the current track.
    #[poise::command(slash_command, guild_only)]
    pub async fn pause(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        let tracks = queued_tracks(ctx, &call).await;
        let Some(current) = tracks.first() else {
            return Err(voice_error("Nothing is playing"));
        };

        call.lock()
            .await
            .queue()
            .pause()
            .map_err(|e| voice_error(&format!("Could not pause: {e}")))?;
        ctx.say(format!(
            "⏸️ Paused **{}**",
            current.title.as_deref().unwrap_or("the current track")
        ))
        .await?;
        Ok(())
    }

    /// Resumes a paused track.
    #[poise::command(slash_command, guild_only)]
    pub async fn resume(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        let tracks = queued_tracks(ctx, &call).await;
        let Some(current) = tracks.first() else {
            return Err(voice_error("Nothing is queued"));
        };

        call.lock()
            .await
            .queue()
            .resume()
            .map_err(|e| voice_error(&format!("Could not resume: {e}")))?;
        ctx.say(format!(
            "▶️ Resumed **{}**",
            current.title.as_deref().unwrap_or("the current track")
        ))
        .await?;
        Ok(())
    }

    /// Stops playback and clears the queue.
    #[poise::command(slash_command, guild_only)]
    pub async fn stop(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        call.lock().await.queue().stop();
        ctx.data().tracks.retain(&guild_key(ctx), &[]).await;
        ctx.say("⏹️ Stopped and cleared the queue.").await?;
        Ok(())
    }

    /// Shows the queue.
    #[poise::command(slash_command, guild_only)]
    pub async fn queue(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        let tracks = queued_tracks(ctx, &call).await;

        let mut embed = serenity::CreateEmbed::default()
            .title("🎵 Queue")
            .description(music::queue_display(&tracks))
            .color(0x0034_98DB);
        if let Some(thumbnail) = tracks.first().and_then(|t| t.thumbnail.as_ref()) {
            embed = embed.thumbnail(thumbnail);
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the current track and how far along it is.
    #[poise::command(slash_command, guild_only)]
    pub async fn nowplaying(ctx: Context<'_>) -> Result<()> {
        let call = current_call(ctx).await?;
        let current = call.lock().await.queue().current();
        let Some(handle) = current else {
            return Err(voice_error("Nothing is playing"));
        };

        let info = ctx
            .data()
            .tracks
            .lookup(&guild_key(ctx), &[handle.uuid().to_string()])
            .await
            .pop()
            .unwrap_or_default();
        let position = handle
            .get_info()
            .await
            .map(|state| state.position)
            .unwrap_or_default();

        let elapsed = music::format_duration(position);
        let total = info
            .duration
            .map_or_else(|| "?".to_string(), music::format_duration);
        let description = format!(
            "{info}\n\n{} `{elapsed} / {total}`",
            music::progress_bar(position, info.duration, PROGRESS_WIDTH)
        );

        let mut embed = serenity::CreateEmbed::default()
            .title("🎶 Now playing")
            .description(description)
            .color(0x0034_98DB);
        if let Some(thumbnail) = &info.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Leaves the voice channel.
    #[poise::command(slash_command, guild_only)]
    pub async fn leave(ctx: Context<'_>) -> Result<()> {
        let guild_id = ctx
            .guild_id()
            .ok_or_else(|| voice_error("This command can only be used in a server"))?;
        let manager = manager(ctx).await?;

        let Some(call) = manager.get(guild_id) else {
            return Err(voice_error("I'm not in a voice channel"));
        };
        call.lock().await.queue().stop();
        manager.remove(guild_id).await?;
        ctx.data().tracks.retain(&guild_id.to_string(), &[]).await;
        ctx.say("👋 Left the voice channel.").await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
