//! General Discord commands - ping and help.
//!
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{bot::Context, errors::Result};

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: Context<'_>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: Context<'_>) -> Result<()> {
        let help_text = "**Frostkeeper Help**\n\
        Here is a summary of all available commands.\n\n\
        **Alliances** (admins)\n\
        • `/alliance add|edit|delete|list` - Manage alliances.\n\
        • `/alliance members|addmember|removemember` - Manage rosters.\n\
        • `/monitor set|status|stop` - Post name, furnace and avatar changes.\n\n\
        **Gift Codes** (admins)\n\
        • `/giftcode add <code> [auto_redeem]` - Store a new code.\n\
        • `/giftcode redeem <code> [alliance]` - Redeem a code for alliance members.\n\
        • `/giftcode redeem_latest` - Redeem the newest active code everywhere.\n\
        • `/giftcode list|delete|queue|stats` - Inspect codes and the queue.\n\n\
        **Administration** (global admins)\n\
        • `/admin add|remove|assign|unassign|list`\n\n\
        **Game Info**\n\
        • `/playerinfo <ids>` - Look up up to 30 players.\n\
        • `/event <name>` - Event guide.\n\
        • `/serverage [days] [date]` - Where your state is on the timeline.\n\
        • `/timeline` - Every milestone.\n\n\
        **Utility**\n\
        • `/search <query>` and `/ask <question>`\n\
        • `/play`, `/pause`, `/resume`, `/skip`, `/stop`, `/queue`, `/nowplaying`, `/leave`\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
