//! Admin Discord commands - who may manage alliances and codes.
//!
//! Only global admins can change the admin list.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, access, handlers::autocomplete},
        core::{admin, alliance},
        errors::Result,
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for managing bot administrators.
    #[poise::command(
        slash_command,
        subcommands(
            "admin_add",
            "admin_remove",
            "admin_assign",
            "admin_unassign",
            "admin_list"
        )
    )]
    pub async fn admin(ctx: Context<'_>) -> Result<()> {
        let help_text = "Admin management command. Available subcommands:\n\
            `/admin add` - Add a global or scoped admin\n\
            `/admin remove` - Remove an admin\n\
            `/admin assign` - Give a scoped admin an alliance\n\
            `/admin unassign` - Take an alliance away from a scoped admin\n\
            `/admin list` - List admins and their alliances";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds a bot administrator, or changes their scope.
    #[poise::command(slash_command, rename = "add")]
    pub async fn admin_add(
        ctx: Context<'_>,
        #[description = "User to promote"] user: serenity::User,
        #[description = "Global admins see every alliance (default: scoped)"] global: Option<bool>,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let is_global = global.unwrap_or(false);

        admin::add_admin(&ctx.data().database, &user.id.to_string(), is_global).await?;
        ctx.say(format!(
            "✅ {} is now a {} admin.",
            user.name,
            if is_global { "global" } else { "scoped" }
        ))
        .await?;
        Ok(())
    }

    /// Removes a bot administrator.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn admin_remove(
        ctx: Context<'_>,
        #[description = "Admin to remove"] user: serenity::User,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;

        admin::remove_admin(&ctx.data().database, &user.id.to_string()).await?;
        ctx.say(format!("✅ {} is no longer an admin.", user.name))
            .await?;
        Ok(())
    }

    /// Gives a scoped admin access to an alliance.
    #[poise::command(slash_command, rename = "assign")]
    pub async fn admin_assign(
        ctx: Context<'_>,
        #[description = "Scoped admin"] user: serenity::User,
        #[description = "Alliance to assign"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        alliance_name: String,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let db = &ctx.data().database;
        let target = alliance::require_alliance_by_name(db, &alliance_name).await?;

        admin::assign_alliance(db, &user.id.to_string(), target.id).await?;
        ctx.say(format!("✅ {} can now manage **{}**.", user.name, target.name))
            .await?;
        Ok(())
    }

    /// Takes an alliance away from a scoped admin.
    #[poise::command(slash_command, rename = "unassign")]
    pub async fn admin_unassign(
        ctx: Context<'_>,
        #[description = "Scoped admin"] user: serenity::User,
        #[description = "Alliance to remove"]
        #[autocomplete = "autocomplete::autocomplete_alliance_name"]
        alliance_name: String,
    ) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let db = &ctx.data().database;
        let target = alliance::require_alliance_by_name(db, &alliance_name).await?;

        if admin::unassign_alliance(db, &user.id.to_string(), target.id).await? {
            ctx.say(format!(
                "✅ {} can no longer manage **{}**.",
                user.name, target.name
            ))
            .await?;
        } else {
            ctx.say(format!(
                "❌ {} was not assigned to **{}**.",
                user.name, target.name
            ))
            .await?;
        }
        Ok(())
    }

    /// Lists admins and their assigned alliances.
    #[poise::command(slash_command, rename = "list")]
    pub async fn admin_list(ctx: Context<'_>) -> Result<()> {
        access::require_global_admin(ctx).await?;
        let db = &ctx.data().database;

        let admins = admin::list_admins(db).await?;
        let mut response = String::from("**Bot administrators**\n");
        for entry in admins {
            if entry.is_global {
                writeln!(&mut response, "🌐 <@{}> · global", entry.user_id)?;
                continue;
            }
            let mut names = Vec::new();
            for alliance_id in admin::assigned_alliance_ids(db, &entry.user_id).await? {
                if let Some(found) = alliance::get_alliance_by_id(db, alliance_id).await? {
                    names.push(found.name);
                }
            }
            let scope = if names.is_empty() {
                "this server's alliances".to_string()
            } else {
                names.join(", ")
            };
            writeln!(&mut response, "🔑 <@{}> · {scope}", entry.user_id)?;
        }

        ctx.send(
            poise::CreateReply::default()
                .content(response)
                .allowed_mentions(serenity::CreateAllowedMentions::new()),
        )
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
