//! Game reference commands - event guides and the state timeline.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, handlers::autocomplete},
        core::{events, timeline},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Shows the guide for an in-game event.
    #[poise::command(slash_command, prefix_command)]
    pub async fn event(
        ctx: Context<'_>,
        #[description = "Event name"]
        #[autocomplete = "autocomplete::autocomplete_event_name"]
        name: String,
    ) -> Result<()> {
        let Some(guide) = events::find_event(&name) else {
            return Err(Error::validation(format!(
                "Unknown event '{name}'. Available: {}",
                events::available_keys()
            )));
        };

        let embed = serenity::CreateEmbed::default()
            .title(format!(
                "{} {}",
                events::category_emoji(guide.category),
                guide.name
            ))
            .color(events::difficulty_color(guide.difficulty))
            .field("Category", guide.category, true)
            .field("Difficulty", guide.difficulty, true)
            .field("Duration", guide.duration, true)
            .field("🎁 Rewards", guide.rewards, false)
            .field("💡 Tips", guide.tips, false)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows where a state is on the timeline.
    ///
    /// Give either the server age in days or the server start date.
    #[poise::command(slash_command, prefix_command)]
    pub async fn serverage(
        ctx: Context<'_>,
        #[description = "Server age in days"] days: Option<u32>,
        #[description = "Server start date (YYYY-MM-DD, DD/MM/YYYY, MM/DD/YYYY or DD.MM.YYYY)"]
        date: Option<String>,
    ) -> Result<()> {
        let day = match (days, date) {
            (Some(days), _) => days,
            (None, Some(date)) => {
                let today = chrono::Utc::now().date_naive();
                timeline::server_age_from_date(&date, today).ok_or_else(|| {
                    Error::validation(format!("Could not read '{date}' as a date"))
                })?
            }
            (None, None) => {
                return Err(Error::validation(
                    "Give the server age in days or the server start date",
                ));
            }
        };

        let mut description = format!("📅 Server day **{day}**\n");
        match timeline::next_milestone(day) {
            Some((next, days_until)) => writeln!(
                &mut description,
                "\n⏭️ **Next: {}** in {days_until} day(s) (day {})\n{}",
                next.event, next.day, next.description
            )?,
            None => writeln!(&mut description, "\n🏁 Every known milestone is unlocked.")?,
        }

        let recent = timeline::recent_milestones(day, 3);
        if !recent.is_empty() {
            writeln!(&mut description, "\n**Recently unlocked**")?;
            for milestone in recent.iter().rev() {
                writeln!(
                    &mut description,
                    "• Day {} · {}",
                    milestone.day, milestone.event
                )?;
            }
        }

        let embed = serenity::CreateEmbed::default()
            .title("🧊 Server Age")
            .description(description)
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists every milestone of the state timeline.
    #[poise::command(slash_command, prefix_command)]
    pub async fn timeline(ctx: Context<'_>) -> Result<()> {
        let mut description = String::new();
        for milestone in timeline::TIMELINE {
            writeln!(
                &mut description,
                "**Day {}** · {}: {}",
                milestone.day, milestone.event, milestone.description
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🗓️ State Timeline")
            .description(description)
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
