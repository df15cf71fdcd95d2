//! Web search and language model commands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, access},
        errors::{Error, Result},
        music::EMBED_DESCRIPTION_LIMIT,
        search,
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Searches the web.
    #[poise::command(slash_command, prefix_command)]
    pub async fn search(
        ctx: Context<'_>,
        #[description = "What to search for"] query: String,
        #[description = "Number of results (1-5, default 3)"]
        #[min = 1]
        #[max = 5]
        max_results: Option<u32>,
    ) -> Result<()> {
        ctx.defer().await?;
        let max = search::clamp_results(max_results);
        let results = ctx.data().search.search(&query, max).await?;

        if results.is_empty() {
            ctx.say(format!("🔍 No results for **{query}**.")).await?;
            return Ok(());
        }

        ctx.say(format!(
            "🔍 Results for **{query}**\n\n{}",
            search::render(&results)
        ))
        .await?;
        Ok(())
    }

    /// Asks the language model a question.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ask(
        ctx: Context<'_>,
        #[description = "Your question"]
        #[rest]
        question: String,
    ) -> Result<()> {
        if question.trim().is_empty() {
            return Err(Error::validation("Ask me something"));
        }
        ctx.defer().await?;

        let answer = ctx.data().llm.ask(&question).await?;
        let answer: String = answer.chars().take(EMBED_DESCRIPTION_LIMIT).collect();

        let embed = serenity::CreateEmbed::default()
            .title("🤖 Answer")
            .description(answer)
            .color(0x0034_98DB)
            .footer(ctx.data().footer());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows language model usage and key health.
    #[poise::command(slash_command)]
    pub async fn llmstats(ctx: Context<'_>) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let stats = ctx.data().llm.stats().await;

        let mut response = String::new();
        writeln!(
            &mut response,
            "📊 Requests: {} · cache hits: {} ({:.1}%)",
            stats.total_requests,
            stats.cache_hits,
            stats.cache_hit_rate * 100.0
        )?;
        if stats.keys.is_empty() {
            writeln!(&mut response, "🔑 No API keys configured")?;
        }
        for key in &stats.keys {
            writeln!(
                &mut response,
                "🔑 Key {} · {} · {:.0}% of {} ok · {} ms avg · {} failure(s) in a row",
                key.index + 1,
                key.status,
                key.success_rate * 100.0,
                key.total,
                key.average_response_time.as_millis(),
                key.consecutive_failures
            )?;
        }

        ctx.send(
            poise::CreateReply::default()
                .content(response)
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
