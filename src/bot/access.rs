//! Permission checks for admin commands.
//!
//! The rules live in [`crate::core::admin`]; this module only gathers the
//! Discord facts they need (caller, server, administrator permission).

use crate::{
    bot::Context,
    core::{admin, admin::Access, alliance},
    entities::alliance as alliance_entity,
    errors::{Error, Result},
};

/// The server the command was used in, as a string id.
pub fn guild_id_string(ctx: Context<'_>) -> Result<String> {
    ctx.guild_id()
        .map(|id| id.to_string())
        .ok_or_else(|| Error::validation("This command can only be used in a server"))
}

/// Whether the caller has the administrator permission or owns the server.
async fn is_guild_admin(ctx: Context<'_>) -> bool {
    if let Some(member) = ctx.author_member().await
        && member
            .permissions
            .is_some_and(|permissions| permissions.administrator())
    {
        return true;
    }
    ctx.guild()
        .is_some_and(|guild| guild.owner_id == ctx.author().id)
}

/// Resolves the caller's admin access, failing when they have none.
pub async fn require_admin(ctx: Context<'_>) -> Result<Access> {
    let user_id = ctx.author().id.to_string();
    let guild_admin = is_guild_admin(ctx).await;
    let data = ctx.data();

    let access = admin::resolve_access(
        &data.database,
        &user_id,
        guild_admin,
        data.config.bot.trust_guild_administrators,
    )
    .await?;

    if access.is_allowed() {
        Ok(access)
    } else {
        Err(Error::permission("You are not a bot administrator"))
    }
}

/// Like [`require_admin`], but only global admins pass.
pub async fn require_global_admin(ctx: Context<'_>) -> Result<Access> {
    let access = require_admin(ctx).await?;
    if access.is_global() {
        Ok(access)
    } else {
        Err(Error::permission("Only global administrators can do this"))
    }
}

/// Alliances the caller may manage.
pub async fn allowed_alliances(
    ctx: Context<'_>,
    access: &Access,
) -> Result<Vec<alliance_entity::Model>> {
    let Some(admin) = access.admin() else {
        return Ok(Vec::new());
    };
    let guild_id = ctx.guild_id().map(|id| id.to_string());
    admin::accessible_alliances(&ctx.data().database, admin, guild_id.as_deref()).await
}

/// Looks up an alliance by name and checks the caller may manage it.
pub async fn require_alliance(
    ctx: Context<'_>,
    access: &Access,
    name: &str,
) -> Result<alliance_entity::Model> {
    let alliance = alliance::require_alliance_by_name(&ctx.data().database, name).await?;
    if access.is_global() {
        return Ok(alliance);
    }
    let allowed = allowed_alliances(ctx, access).await?;
    if allowed.iter().any(|a| a.id == alliance.id) {
        Ok(alliance)
    } else {
        Err(Error::permission(format!(
            "You cannot manage the alliance '{}'",
            alliance.name
        )))
    }
}
