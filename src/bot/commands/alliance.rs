//! Alliance Discord commands - `/alliance` and its subcommands.
//!
//! Every subcommand requires admin access; scoped admins only see and manage
//! the alliances available to them.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            Context, access,
            format::{self, EMBED_DESCRIPTION_LIMIT},
            handlers::autocomplete,
        },
        core::{
            admin,
            alliance::{self, AllianceUpdate, DEFAULT_INTERVAL_MINUTES},
            furnace, member,
        },
        errors::Result,
        wos::validate_ids,
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for managing alliances and their rosters.
    #[poise::command(
        slash_command,
        guild_only,
        subcommands(
            "alliance_add",
            "alliance_edit",
            "alliance_delete",
            "alliance_list",
            "alliance_members",
            "alliance_addmember",
            "alliance_removemember"
        )
    )]
    pub async fn alliance(ctx: Context<'_>) -> Result<()> {
        let help_text = "Alliance management command. Available subcommands:\n\
            `/alliance add` - Register an alliance in this server\n\
            `/alliance edit` - Change name, channel, interval or auto-redeem\n\
            `/alliance delete` - Delete an alliance and its roster\n\
            `/alliance list` - List the alliances you manage\n\
            `/alliance members` - Show an alliance roster\n\
            `/alliance addmember` - Add players by id\n\
            `/alliance removemember` - Remove a player";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Registers a new alliance in this server.
    #[poise::command(slash_command, rename = "add")]
    pub async fn alliance_add(
        ctx: Context<'_>,
        #[description = "Unique alliance name"] name: String,
        #[description = "Channel for redemption reports"] channel: Option<serenity::GuildChannel>,
        #[description = "Refresh interval in minutes (default 60)"] interval: Option<i32>,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let guild_id = access::guild_id_string(ctx)?;

        let created = alliance::create_alliance(
            &ctx.data().database,
            &name,
            &guild_id,
            channel.map(|c| c.id.to_string()),
            interval.unwrap_or(DEFAULT_INTERVAL_MINUTES),
        )
        .await?;

        ctx.say(format!(
            "✅ Alliance **{}** created (id {}).",
            created.name, created.id
        ))
        .await?;
        Ok(())
    }

    /// Changes the settings of an alliance.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn alliance_edit(
        ctx: Context<'_>,
        #[description = "Alliance to edit"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
        #[description = "New name"] new_name: Option<String>,
        #[description = "New report channel"] channel: Option<serenity::GuildChannel>,
        #[description = "Remove the report channel"] clear_channel: Option<bool>,
        #[description = "New refresh interval in minutes"] interval: Option<i32>,
        #[description = "Redeem new codes automatically"] auto_redeem: Option<bool>,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let existing = access::require_alliance(ctx, &access, &name).await?;

        let channel_id = if clear_channel.unwrap_or(false) {
            Some(None)
        } else {
            channel.map(|c| Some(c.id.to_string()))
        };
        let update = AllianceUpdate {
            name: new_name,
            channel_id,
            interval_minutes: interval,
            auto_redeem,
        };

        let updated = alliance::update_alliance(&ctx.data().database, existing.id, update).await?;

        let mut response = format!("✅ Alliance **{}** updated.\n", updated.name);
        writeln!(
            &mut response,
            "📢 Channel: {}",
            updated
                .channel_id
                .as_deref()
                .map_or_else(|| "none".to_string(), |id| format!("<#{id}>"))
        )?;
        writeln!(&mut response, "⏱️ Interval: {} min", updated.interval_minutes)?;
        writeln!(
            &mut response,
            "🎁 Auto-redeem: {}",
            if updated.auto_redeem { "on" } else { "off" }
        )?;
        ctx.say(response).await?;
        Ok(())
    }

    /// Deletes an alliance together with its roster and monitors.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn alliance_delete(
        ctx: Context<'_>,
        #[description = "Alliance to delete"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
    ) -> Result<()> {
        let access = access::require_global_admin(ctx).await?;
        let existing = access::require_alliance(ctx, &access, &name).await?;

        let removed = alliance::delete_alliance(&ctx.data().database, existing.id).await?;
        ctx.say(format!(
            "🗑️ Alliance **{}** deleted ({removed} member(s) removed).",
            existing.name
        ))
        .await?;
        Ok(())
    }

    /// Lists the alliances you manage with their member counts.
    #[poise::command(slash_command, rename = "list")]
    pub async fn alliance_list(ctx: Context<'_>) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let allowed = access::allowed_alliances(ctx, &access).await?;

        if allowed.is_empty() {
            ctx.say("📂 No alliances yet. Create one with `/alliance add`.")
                .await?;
            return Ok(());
        }

        let db = &ctx.data().database;
        let mut lines = Vec::with_capacity(allowed.len());
        for entry in &allowed {
            let count = member::count_members(db, entry.id).await?;
            let channel = entry
                .channel_id
                .as_deref()
                .map_or_else(|| "none".to_string(), |id| format!("<#{id}>"));
            lines.push(format!(
                "**{}** (id {}) · 👥 {count} · 📢 {channel} · ⏱️ {} min · 🎁 {}",
                entry.name,
                entry.id,
                entry.interval_minutes,
                if entry.auto_redeem { "on" } else { "off" }
            ));
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("🏰 Alliances ({})", allowed.len()))
            .description(format::fit_lines(&lines, EMBED_DESCRIPTION_LIMIT))
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the roster of an alliance, highest furnace first.
    #[poise::command(slash_command, rename = "members")]
    pub async fn alliance_members(
        ctx: Context<'_>,
        #[description = "Alliance to show"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let existing = access::require_alliance(ctx, &access, &name).await?;
        let members = member::list_members(&ctx.data().database, existing.id).await?;

        if members.is_empty() {
            ctx.say(format!(
                "📂 **{}** has no members. Add some with `/alliance addmember`.",
                existing.name
            ))
            .await?;
            return Ok(());
        }

        let lines: Vec<String> = members
            .iter()
            .map(|entry| {
                format!(
                    "{} **{}** · {} · `{}`",
                    furnace::furnace_emoji(entry.furnace_level),
                    entry.nickname,
                    furnace::furnace_label(entry.furnace_level),
                    entry.fid
                )
            })
            .collect();
        let description = format::fit_lines(&lines, EMBED_DESCRIPTION_LIMIT);

        let embed = serenity::CreateEmbed::default()
            .title(format!("👥 {} ({} members)", existing.name, members.len()))
            .description(description)
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Adds players to an alliance by their 9-digit ids.
    #[poise::command(slash_command, rename = "addmember")]
    pub async fn alliance_addmember(
        ctx: Context<'_>,
        #[description = "Alliance to add to"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
        #[description = "Player ids separated by commas or spaces"] ids: String,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let existing = access::require_alliance(ctx, &access, &name).await?;
        let data = ctx.data();
        let ids = validate_ids(&ids, data.players.max_batch())?;
        let guild_id = ctx.guild_id().map(|id| id.to_string());

        ctx.defer().await?;

        let mut movable = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();
        if let Some(caller) = access.admin() {
            for fid in ids {
                match admin::check_member_move(
                    &data.database,
                    caller,
                    guild_id.as_deref(),
                    &fid,
                    existing.id,
                )
                .await
                {
                    Ok(()) => movable.push(fid),
                    Err(e) if e.is_user_facing() => failed.push(format!("`{fid}`: {e}")),
                    Err(e) => return Err(e),
                }
            }
        }

        let mut added = Vec::new();
        for (fid, result) in data.players.fetch_many(&movable).await {
            match result {
                Ok(info) => {
                    member::add_member(&data.database, existing.id, info.to_snapshot()).await?;
                    added.push(format!(
                        "{} ({}, {})",
                        info.nickname,
                        info.fid,
                        info.furnace_label()
                    ));
                }
                Err(e) => failed.push(format!("`{fid}`: {e}")),
            }
        }

        ctx.say(format::member_report(&existing.name, &added, &failed))
            .await?;
        Ok(())
    }

    /// Removes a player from whichever alliance holds them.
    #[poise::command(slash_command, rename = "removemember")]
    pub async fn alliance_removemember(
        ctx: Context<'_>,
        #[description = "Alliance the player belongs to"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        name: String,
        #[description = "9-digit player id"] fid: String,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let existing = access::require_alliance(ctx, &access, &name).await?;
        let db = &ctx.data().database;
        let fid = fid.trim();

        let belongs = member::get_member(db, fid)
            .await?
            .is_some_and(|m| m.alliance_id == existing.id);
        if !belongs {
            ctx.say(format!("❌ `{fid}` is not a member of **{}**.", existing.name))
                .await?;
            return Ok(());
        }

        member::remove_member(db, fid).await?;
        ctx.say(format!("✅ Removed `{fid}` from **{}**.", existing.name))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
