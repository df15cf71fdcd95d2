//! Gift code Discord commands - storing codes and queueing redemptions.
//!
//! Redemption itself runs in the background worker; these commands only
//! queue jobs and report on them.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            Context, access,
            format::{self, MESSAGE_LIMIT},
            handlers::autocomplete,
        },
        core::{giftcode, state},
        entities::gift_code::CodeStatus,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    const fn status_emoji(status: CodeStatus) -> &'static str {
        match status {
            CodeStatus::Pending => "⏳",
            CodeStatus::Valid => "✅",
            CodeStatus::Invalid => "❌",
            CodeStatus::Expired => "⌛",
            CodeStatus::Exhausted => "🚫",
        }
    }

    /// Parent command for gift codes.
    #[poise::command(
        slash_command,
        guild_only,
        subcommands(
            "giftcode_add",
            "giftcode_list",
            "giftcode_delete",
            "giftcode_redeem",
            "giftcode_redeem_latest",
            "giftcode_queue",
            "giftcode_stats"
        )
    )]
    pub async fn giftcode(ctx: Context<'_>) -> Result<()> {
        let help_text = "Gift code command. Available subcommands:\n\
            `/giftcode add` - Store a code (queued for auto-redeem alliances)\n\
            `/giftcode list` - List known codes\n\
            `/giftcode delete` - Forget a code\n\
            `/giftcode redeem` - Redeem a code for your alliances\n\
            `/giftcode redeem_latest` - Redeem the newest active code\n\
            `/giftcode queue` - Show the redemption queue\n\
            `/giftcode stats` - Outcomes for a code";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Stores a new gift code.
    ///
    /// New codes are queued for every alliance with auto-redeem enabled.
    #[poise::command(slash_command, rename = "add")]
    pub async fn giftcode_add(
        ctx: Context<'_>,
        #[description = "The gift code"] code: String,
    ) -> Result<()> {
        access::require_admin(ctx).await?;
        let data = ctx.data();

        let (stored, created) = giftcode::add_gift_code(&data.database, &code).await?;
        if !created {
            ctx.say(format!(
                "⚠️ Code `{}` is already known ({}).",
                stored.code,
                stored.status.as_str()
            ))
            .await?;
            return Ok(());
        }

        let queued = data.redemption.enqueue_auto_redeem(&stored.code).await?;
        let mut response = format!("✅ Code `{}` added.", stored.code);
        if !queued.is_empty() {
            write!(
                &mut response,
                "\n🎁 Queued for {} auto-redeem alliance(s).",
                queued.len()
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Lists every known code with its status.
    #[poise::command(slash_command, rename = "list")]
    pub async fn giftcode_list(ctx: Context<'_>) -> Result<()> {
        access::require_admin(ctx).await?;
        let codes = giftcode::list_gift_codes(&ctx.data().database).await?;

        if codes.is_empty() {
            ctx.say("📂 No gift codes yet. Add one with `/giftcode add`.")
                .await?;
            return Ok(());
        }

        let mut description = String::new();
        for entry in codes.iter().take(50) {
            writeln!(
                &mut description,
                "{} `{}` · {} · added {}",
                status_emoji(entry.status),
                entry.code,
                entry.status.as_str(),
                entry.added_at.format("%Y-%m-%d")
            )?;
        }
        if codes.len() > 50 {
            writeln!(&mut description, "... and {} more", codes.len() - 50)?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🎁 Gift Codes")
            .description(description)
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Forgets a code and drops its queued jobs.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn giftcode_delete(
        ctx: Context<'_>,
        #[description = "Code to delete"]
        #[autocomplete = "autocomplete::autocomplete_gift_code"]
        code: String,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;

        if giftcode::delete_gift_code(&ctx.data().database, &code).await? {
            ctx.say(format!("🗑️ Code `{}` deleted.", code.trim())).await?;
        } else {
            ctx.say(format!("❌ Code `{}` is not known.", code.trim()))
                .await?;
        }
        Ok(())
    }

    /// Redeems a code for one alliance, or for every alliance you manage.
    #[poise::command(slash_command, rename = "redeem")]
    pub async fn giftcode_redeem(
        ctx: Context<'_>,
        #[description = "Code to redeem"]
        #[autocomplete = "autocomplete::autocomplete_gift_code"]
        code: String,
        #[description = "Only this alliance (default: all you manage)"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        alliance: Option<String>,
    ) -> Result<()> {
        let access = access::require_admin(ctx).await?;
        let data = ctx.data();

        let (stored, _) = giftcode::add_gift_code(&data.database, &code).await?;
        if stored.status.is_dead() {
            return Err(Error::validation(format!(
                "Code `{}` is {} and cannot be redeemed",
                stored.code,
                stored.status.as_str()
            )));
        }

        let targets = match alliance {
            Some(name) => vec![access::require_alliance(ctx, &access, &name).await?],
            None => access::allowed_alliances(ctx, &access).await?,
        };
        queue_for(ctx, &stored.code, &targets).await
    }

    /// Redeems the newest active code for every alliance you manage.
    #[poise::command(slash_command, rename = "redeem_latest")]
    pub async fn giftcode_redeem_latest(ctx: Context<'_>) -> Result<()> {
        let access = access::require_admin(ctx).await?;

        let Some(latest) = giftcode::latest_active_code(&ctx.data().database).await? else {
            ctx.say("📂 There is no active gift code.").await?;
            return Ok(());
        };

        let targets = access::allowed_alliances(ctx, &access).await?;
        queue_for(ctx, &latest.code, &targets).await
    }

    async fn queue_for(
        ctx: Context<'_>,
        code: &str,
        targets: &[crate::entities::alliance::Model],
    ) -> Result<()> {
        if targets.is_empty() {
            return Err(Error::validation("You don't manage any alliance"));
        }

        let ids: Vec<i64> = targets.iter().map(|a| a.id).collect();
        let positions = ctx
            .data()
            .redemption
            .enqueue(code, &ids, Some(ctx.author().id.to_string()))
            .await?;

        let header = format!("🎁 Queued `{code}`:\n");
        let lines: Vec<String> = targets
            .iter()
            .zip(positions)
            .map(|(target, position)| format!("• **{}** · position {position}", target.name))
            .collect();
        let body = format::fit_lines(&lines, MESSAGE_LIMIT - header.chars().count());
        ctx.say(format!("{header}{body}")).await?;
        Ok(())
    }

    /// Shows the redemption queue and the job in progress.
    #[poise::command(slash_command, rename = "queue")]
    pub async fn giftcode_queue(ctx: Context<'_>) -> Result<()> {
        access::require_admin(ctx).await?;
        let status = ctx.data().redemption.status().await?;

        let mut description = String::new();
        match &status.current {
            Some(job) => writeln!(
                &mut description,
                "⚙️ Processing `{}` for **{}** ({}/{})",
                job.code, job.alliance_name, job.processed, job.total
            )?,
            None => writeln!(&mut description, "💤 Idle")?,
        }
        writeln!(
            &mut description,
            "📋 {} job(s) waiting",
            status.queue.queue_length
        )?;
        for (code, alliances) in &status.queue.items {
            writeln!(&mut description, "• `{code}` · {alliances} alliance(s)")?;
        }
        if let Some(finished) =
            state::get_timestamp(&ctx.data().database, state::REDEMPTION_LAST_JOB).await?
        {
            writeln!(
                &mut description,
                "\n🕒 Last job finished {}",
                finished.format("%Y-%m-%d %H:%M UTC")
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🎁 Redemption Queue")
            .description(description)
            .color(if status.processing { 0x00F1_C40F } else { 0x002E_CC71 })
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows how redemption of a code went, plus CAPTCHA figures.
    #[poise::command(slash_command, rename = "stats")]
    pub async fn giftcode_stats(
        ctx: Context<'_>,
        #[description = "Code to inspect"]
        #[autocomplete = "autocomplete::autocomplete_gift_code"]
        code: String,
    ) -> Result<()> {
        access::require_admin(ctx).await?;
        let data = ctx.data();

        let Some(stored) = giftcode::get_gift_code(&data.database, code.trim()).await? else {
            return Err(Error::GiftCodeNotFound {
                code: code.trim().to_string(),
            });
        };
        let outcomes = giftcode::redemption_stats(&data.database, &stored.code).await?;
        let captcha = data.redeemer.stats();

        let mut by_outcome = String::new();
        if outcomes.is_empty() {
            by_outcome.push_str("No attempts yet");
        }
        for (outcome, count) in &outcomes {
            writeln!(&mut by_outcome, "`{outcome}`: {count}")?;
        }

        let captcha_text = format!(
            "Solved: {}\nWell-formed: {}\nSubmitted: {}\nAccepted: {}\nRejected: {}",
            captcha.solver_calls,
            captcha.valid_formats,
            captcha.submissions,
            captcha.captcha_accepted,
            captcha.captcha_rejected
        );

        let embed = serenity::CreateEmbed::default()
            .title(format!(
                "{} {} ({})",
                status_emoji(stored.status),
                stored.code,
                stored.status.as_str()
            ))
            .color(0x0034_98DB)
            .field("Outcomes", by_outcome, true)
            .field("CAPTCHA (since start)", captcha_text, true)
            .footer(data.footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
