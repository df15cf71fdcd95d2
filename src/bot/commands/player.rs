//! Player lookup command.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::Context,
        core::furnace,
        errors::Result,
        music::EMBED_DESCRIPTION_LIMIT,
        wos::{PlayerInfo, validate_ids},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    fn player_embed(info: &PlayerInfo) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::default()
            .title(format!("👤 {}", info.nickname))
            .color(0x0034_98DB)
            .field("ID", format!("`{}`", info.fid), true)
            .field("State", format!("#{}", info.kid), true)
            .field(
                "Furnace",
                format!(
                    "{} {}",
                    furnace::furnace_emoji(info.furnace_level),
                    furnace::furnace_display(info.furnace_level)
                ),
                true,
            );
        if let Some(avatar) = &info.avatar_url {
            embed = embed.thumbnail(avatar);
        }
        if let Some(icon) = &info.stove_icon {
            embed = embed.image(icon);
        }
        embed
    }

    /// Looks up players by their 9-digit ids.
    #[poise::command(slash_command, prefix_command)]
    pub async fn playerinfo(
        ctx: Context<'_>,
        #[description = "Player ids separated by commas or spaces (up to 30)"] ids: String,
    ) -> Result<()> {
        let data = ctx.data();
        let ids = validate_ids(&ids, data.players.max_batch())?;

        ctx.defer().await?;
        let results = data.players.fetch_many(&ids).await;

        if let [(_, Ok(info))] = results.as_slice() {
            let embed = player_embed(info).footer(data.footer());
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }

        let mut found = String::new();
        let mut failed = String::new();
        for (fid, result) in &results {
            match result {
                Ok(info) => {
                    let line = format!(
                        "{} **{}** · `{}` · #{} · {}\n",
                        furnace::furnace_emoji(info.furnace_level),
                        info.nickname,
                        info.fid,
                        info.kid,
                        furnace::furnace_display(info.furnace_level)
                    );
                    if found.len() + line.len() < EMBED_DESCRIPTION_LIMIT {
                        found.push_str(&line);
                    }
                }
                Err(e) => writeln!(&mut failed, "`{fid}`: {e}")?,
            }
        }

        let mut embed = serenity::CreateEmbed::default()
            .title(format!("👥 {} player(s)", results.len()))
            .color(0x0034_98DB)
            .footer(data.footer());
        if !found.is_empty() {
            embed = embed.description(found);
        }
        if !failed.is_empty() {
            let failed: String = failed.chars().take(1000).collect();
            embed = embed.field("❌ Not found", failed, false);
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
