//! Alliance monitor commands - where name, furnace and avatar changes are posted.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            Context, access,
            format::{self, MESSAGE_LIMIT},
            handlers::autocomplete,
        },
        core::{alliance, monitor, state},
        errors::Result,
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for alliance monitoring.
    #[poise::command(
        slash_command,
        guild_only,
        subcommands("monitor_set", "monitor_status", "monitor_stop")
    )]
    pub async fn monitor(ctx: Context<'_>) -> Result<()> {
        let help_text = "Alliance monitor command. Available subcommands:\n\
            `/monitor set` - Post member changes of an alliance to a channel\n\
            `/monitor status` - Show the monitors of this server\n\
            `/monitor stop` - Stop monitoring an alliance";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Starts monitoring an alliance in this server.
    #[poise::command(slash_command, rename = "set")]
    pub async fn monitor_set(
        ctx: Context<'_>,
        #[description = "Alliance to monitor"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
        #[description = "Channel for change notices"] channel: serenity::GuildChannel,
        #[description = "Seconds between scans (min 60, default 300)"] interval: Option<i32>,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let target = access::require_alliance(ctx, &access, &name).await?;
        let guild_id = access::guild_id_string(ctx)?;

        let row = monitor::set_monitoring(
            &ctx.data().database,
            &guild_id,
            target.id,
            &channel.id.to_string(),
            interval.unwrap_or(monitor::DEFAULT_CHECK_INTERVAL_SECS),
        )
        .await?;

        ctx.say(format!(
            "👁️ Monitoring **{}** in <#{}> every {} s.",
            target.name, row.channel_id, row.check_interval_secs
        ))
        .await?;
        Ok(())
    }

    /// Shows the monitors configured in this server.
    #[poise::command(slash_command, rename = "status")]
    pub async fn monitor_status(ctx: Context<'_>) -> Result<()> {
        access::require_admin(ctx).await?;
        let guild_id = access::guild_id_string(ctx)?;
        let db = &ctx.data().database;

        let rows = monitor::monitoring_for_guild(db, &guild_id).await?;
        if rows.is_empty() {
            ctx.say("📂 No alliance is monitored in this server. Use `/monitor set`.")
                .await?;
            return Ok(());
        }

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let name = alliance::get_alliance_by_id(db, row.alliance_id)
                .await?
                .map_or_else(|| format!("#{}", row.alliance_id), |a| a.name);
            lines.push(format!(
                "{} **{name}** · <#{}> · every {} s · last scan {}",
                if row.enabled { "🟢" } else { "⚪" },
                row.channel_id,
                row.check_interval_secs,
                row.updated_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }

        let mut response = String::from("**Alliance monitors**\n");
        response.push_str(&format::fit_lines(&lines, MESSAGE_LIMIT - 64));
        if let Some(swept) = state::get_timestamp(db, state::MONITOR_LAST_SWEEP).await? {
            writeln!(
                &mut response,
                "\n🕒 Last sweep {}",
                swept.format("%Y-%m-%d %H:%M UTC")
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Stops monitoring an alliance in this server.
    #[poise::command(slash_command, rename = "stop")]
    pub async fn monitor_stop(
        ctx: Context<'_>,
        #[description = "Alliance to stop monitoring"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let target = access::require_alliance(ctx, &access, &name).await?;
        let guild_id = access::guild_id_string(ctx)?;

        if monitor::disable_monitoring(&ctx.data().database, &guild_id, target.id).await? {
            ctx.say(format!("✅ Stopped monitoring **{}**.", target.name))
                .await?;
        } else {
            ctx.say(format!("❌ **{}** is not monitored here.", target.name))
                .await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
