//! Permission management - who may manage alliances and gift codes.
//!
//! There are two kinds of admins. Global admins see every alliance; scoped
//! admins see the alliances assigned to them, or, when nothing is assigned,
//! the alliances registered in the server they are calling from.

use crate::{
    core::{alliance, member},
    entities::{Admin, AdminAlliance, admin, admin_alliance, alliance as alliance_entity},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No admins existed, so the caller became the first global admin
    Bootstrapped(admin::Model),
    /// Caller is a global admin
    Global(admin::Model),
    /// Caller is a scoped admin
    Scoped(admin::Model),
    /// Caller is not an admin
    Denied,
}

impl Access {
    /// The admin record, when access was granted.
    #[must_use]
    pub const fn admin(&self) -> Option<&admin::Model> {
        match self {
            Self::Bootstrapped(admin) | Self::Global(admin) | Self::Scoped(admin) => Some(admin),
            Self::Denied => None,
        }
    }

    /// Whether the caller may use admin commands.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Whether the caller sees every alliance.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Bootstrapped(_) | Self::Global(_))
    }
}

/// Number of admins.
pub async fn count_admins<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    Admin::find().count(db).await.map_err(Into::into)
}

/// Number of global admins.
async fn count_global_admins<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    Admin::find()
        .filter(admin::Column::IsGlobal.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Finds an admin by Discord user id.
pub async fn get_admin<C>(db: &C, user_id: &str) -> Result<Option<admin::Model>>
where
    C: ConnectionTrait,
{
    Admin::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// All admins, global admins first, then by user id.
pub async fn list_admins(db: &DatabaseConnection) -> Result<Vec<admin::Model>> {
    Admin::find()
        .order_by_desc(admin::Column::IsGlobal)
        .order_by_asc(admin::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds an admin, or changes the scope of an existing one.
pub async fn add_admin<C>(db: &C, user_id: &str, is_global: bool) -> Result<admin::Model>
where
    C: ConnectionTrait,
{
    let user_id = user_id.trim();
    if user_id.is_empty() || !user_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "'{user_id}' is not a Discord user id"
        )));
    }

    if let Some(existing) = get_admin(db, user_id).await? {
        if existing.is_global == is_global {
            return Ok(existing);
        }
        let mut active: admin::ActiveModel = existing.into();
        active.is_global = Set(is_global);
        return active.update(db).await.map_err(Into::into);
    }

    let admin = admin::ActiveModel {
        user_id: Set(user_id.to_string()),
        is_global: Set(is_global),
        created_at: Set(chrono::Utc::now().naive_utc()),
    };
    let result = admin.insert(db).await?;
    info!(
        "Added {} admin {}",
        if is_global { "global" } else { "scoped" },
        result.user_id
    );
    Ok(result)
}

/// Removes an admin and their alliance assignments.
///
/// The last global admin cannot be removed.
pub async fn remove_admin(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    let txn = db.begin().await?;

    let existing = get_admin(&txn, user_id)
        .await?
        .ok_or_else(|| Error::AdminNotFound {
            user_id: user_id.to_string(),
        })?;

    if existing.is_global && count_global_admins(&txn).await? <= 1 {
        return Err(Error::permission("Cannot remove the last global admin"));
    }

    AdminAlliance::delete_many()
        .filter(admin_alliance::Column::AdminId.eq(user_id))
        .exec(&txn)
        .await?;
    Admin::delete_by_id(user_id.to_string()).exec(&txn).await?;

    txn.commit().await?;
    info!("Removed admin {user_id}");
    Ok(())
}

/// Gives a scoped admin access to an alliance.
///
/// # Errors
/// * [`Error::AdminNotFound`] - `admin_id` is not an admin
/// * [`Error::AllianceNotFound`] - No alliance has this id
/// * [`Error::Validation`] - The assignment already exists
pub async fn assign_alliance(
    db: &DatabaseConnection,
    admin_id: &str,
    alliance_id: i64,
) -> Result<admin_alliance::Model> {
    if get_admin(db, admin_id).await?.is_none() {
        return Err(Error::AdminNotFound {
            user_id: admin_id.to_string(),
        });
    }
    let alliance = alliance::get_alliance_by_id(db, alliance_id)
        .await?
        .ok_or_else(|| Error::AllianceNotFound {
            name: alliance_id.to_string(),
        })?;

    let duplicate = AdminAlliance::find()
        .filter(admin_alliance::Column::AdminId.eq(admin_id))
        .filter(admin_alliance::Column::AllianceId.eq(alliance_id))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(Error::validation(format!(
            "Admin {admin_id} is already assigned to {}",
            alliance.name
        )));
    }

    let assignment = admin_alliance::ActiveModel {
        admin_id: Set(admin_id.to_string()),
        alliance_id: Set(alliance_id),
        ..Default::default()
    };
    assignment.insert(db).await.map_err(Into::into)
}

/// Removes an assignment. Returns whether one existed.
pub async fn unassign_alliance(
    db: &DatabaseConnection,
    admin_id: &str,
    alliance_id: i64,
) -> Result<bool> {
    let result = AdminAlliance::delete_many()
        .filter(admin_alliance::Column::AdminId.eq(admin_id))
        .filter(admin_alliance::Column::AllianceId.eq(alliance_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Ids of the alliances assigned to an admin.
pub async fn assigned_alliance_ids(db: &DatabaseConnection, admin_id: &str) -> Result<Vec<i64>> {
    let rows = AdminAlliance::find()
        .filter(admin_alliance::Column::AdminId.eq(admin_id))
        .order_by_asc(admin_alliance::Column::AllianceId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.alliance_id).collect())
}

/// Decides whether `user_id` may use admin commands.
///
/// `is_guild_admin` is true when the caller has the Discord administrator
/// permission or owns the server. Such callers are trusted as global admins
/// when `trust_guild_admins` is set.
///
/// # Arguments
/// * `db` - Database connection
/// * `user_id` - Discord user id of the caller
/// * `is_guild_admin` - Caller administers or owns the current server
/// * `trust_guild_admins` - Promote such callers to global admin
///
/// # Returns
/// * `Ok(Access::Bootstrapped(_))` - No admins existed; the caller is now the first one
/// * `Ok(Access::Global(_))` / `Ok(Access::Scoped(_))` - The caller is an admin
/// * `Ok(Access::Denied)` - The caller may not use admin commands
#[instrument(skip(db))]
pub async fn resolve_access(
    db: &DatabaseConnection,
    user_id: &str,
    is_guild_admin: bool,
    trust_guild_admins: bool,
) -> Result<Access> {
    let txn = db.begin().await?;

    if count_admins(&txn).await? == 0 {
        let admin = add_admin(&txn, user_id, true).await?;
        txn.commit().await?;
        info!("No admins configured, bootstrapped {user_id} as global admin");
        return Ok(Access::Bootstrapped(admin));
    }

    if let Some(admin) = get_admin(&txn, user_id).await? {
        return Ok(if admin.is_global {
            Access::Global(admin)
        } else {
            Access::Scoped(admin)
        });
    }

    if is_guild_admin && trust_guild_admins {
        let admin = add_admin(&txn, user_id, true).await?;
        txn.commit().await?;
        info!("Granted global admin to server administrator {user_id}");
        return Ok(Access::Global(admin));
    }

    Ok(Access::Denied)
}

/// Alliances an admin may see and manage.
///
/// Global admins see every alliance. Scoped admins see their assigned
/// alliances or, with no assignments, those registered in `guild_id`.
///
/// # Arguments
/// * `db` - Database connection
/// * `admin` - The admin record
/// * `guild_id` - Server the command was used in, if any
pub async fn accessible_alliances(
    db: &DatabaseConnection,
    admin: &admin::Model,
    guild_id: Option<&str>,
) -> Result<Vec<alliance_entity::Model>> {
    if admin.is_global {
        return alliance::list_alliances(db).await;
    }

    let assigned = assigned_alliance_ids(db, &admin.user_id).await?;
    if !assigned.is_empty() {
        let mut alliances = crate::entities::Alliance::find()
            .filter(alliance_entity::Column::Id.is_in(assigned))
            .all(db)
            .await?;
        alliances.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(alliances);
    }

    match guild_id {
        Some(guild_id) => alliance::list_alliances_for_guild(db, guild_id).await,
        None => Ok(Vec::new()),
    }
}

/// Whether `user_id` may manage the given alliance.
pub async fn can_manage_alliance(
    db: &DatabaseConnection,
    user_id: &str,
    guild_id: Option<&str>,
    alliance_id: i64,
) -> Result<bool> {
    let Some(admin) = get_admin(db, user_id).await? else {
        return Ok(false);
    };
    let alliances = accessible_alliances(db, &admin, guild_id).await?;
    Ok(alliances.iter().any(|a| a.id == alliance_id))
}

/// Checks that `admin` may put the player `fid` into `target_alliance_id`.
///
/// Adding a player who already belongs to another alliance moves them, so a
/// scoped admin must also manage the alliance the player is leaving.
///
/// # Arguments
/// * `db` - Database connection
/// * `admin` - The admin performing the change
/// * `guild_id` - Server the command was used in
/// * `fid` - Player id being added
/// * `target_alliance_id` - Alliance the player is added to
///
/// # Errors
/// Returns [`Error::Permission`] when the player sits in an alliance the
/// admin cannot manage, or a database error.
pub async fn check_member_move(
    db: &DatabaseConnection,
    admin: &admin::Model,
    guild_id: Option<&str>,
    fid: &str,
    target_alliance_id: i64,
) -> Result<()> {
    if admin.is_global {
        return Ok(());
    }
    let Some(existing) = member::get_member(db, fid).await? else {
        return Ok(());
    };
    if existing.alliance_id == target_alliance_id {
        return Ok(());
    }

    let allowed = accessible_alliances(db, admin, guild_id).await?;
    if allowed.iter().any(|a| a.id == existing.alliance_id) {
        Ok(())
    } else {
        Err(Error::permission(format!(
            "Player {fid} belongs to an alliance you cannot manage"
        )))
    }
}

/// Seeds global admins from configuration. Existing admins are left alone.
///
/// Returns the number of admins created.
pub async fn seed_initial_admins(db: &DatabaseConnection, ids: &[String]) -> Result<usize> {
    let mut created = 0;
    for id in ids {
        if get_admin(db, id).await?.is_none() {
            add_admin(db, id, true).await?;
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_first_caller_is_bootstrapped() -> Result<()> {
        let db = setup_test_db().await?;

        let access = resolve_access(&db, "1001", false, true).await?;
        assert!(matches!(access, Access::Bootstrapped(_)));
        assert!(access.is_global());
        assert_eq!(count_admins(&db).await?, 1);

        // A second caller is no longer bootstrapped
        let access = resolve_access(&db, "1002", false, true).await?;
        assert_eq!(access, Access::Denied);
        assert!(!access.is_allowed());

        Ok(())
    }

    #[tokio::test]
    async fn test_existing_admins_resolve_by_scope() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_admin(&db, "1", true).await?;
        create_test_admin(&db, "2", false).await?;

        assert!(matches!(
            resolve_access(&db, "1", false, false).await?,
            Access::Global(_)
        ));
        assert!(matches!(
            resolve_access(&db, "2", false, false).await?,
            Access::Scoped(_)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_guild_admin_trust() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_admin(&db, "1", true).await?;

        let denied = resolve_access(&db, "77", true, false).await?;
        assert_eq!(denied, Access::Denied);

        let granted = resolve_access(&db, "77", true, true).await?;
        assert!(matches!(granted, Access::Global(_)));
        assert!(get_admin(&db, "77").await?.unwrap().is_global);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_admin_validates_and_updates() -> Result<()> {
        let db = setup_test_db().await?;

        let result = add_admin(&db, "not-an-id", true).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        add_admin(&db, "5", false).await?;
        let promoted = add_admin(&db, "5", true).await?;
        assert!(promoted.is_global);
        assert_eq!(count_admins(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_last_global_admin_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_admin(&db, "1", true).await?;
        create_test_admin(&db, "2", false).await?;

        let result = remove_admin(&db, "1").await;
        assert!(matches!(result, Err(Error::Permission { .. })));

        remove_admin(&db, "2").await?;
        let missing = remove_admin(&db, "2").await;
        assert!(matches!(missing, Err(Error::AdminNotFound { .. })));

        create_test_admin(&db, "3", true).await?;
        remove_admin(&db, "1").await?;
        assert_eq!(list_admins(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_assignments_and_accessible_alliances() -> Result<()> {
        let db = setup_test_db().await?;
        let global = create_test_admin(&db, "1", true).await?;
        let scoped = create_test_admin(&db, "2", false).await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        let fire = create_alliance_in_guild(&db, "FIRE", "guild-b").await?;

        assert_eq!(accessible_alliances(&db, &global, None).await?.len(), 2);

        // Nothing assigned: falls back to the current server's alliances
        let fallback = accessible_alliances(&db, &scoped, Some("guild-b")).await?;
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].id, fire.id);
        assert!(accessible_alliances(&db, &scoped, None).await?.is_empty());

        assign_alliance(&db, "2", ice.id).await?;
        let duplicate = assign_alliance(&db, "2", ice.id).await;
        assert!(matches!(duplicate, Err(Error::Validation { .. })));

        let assigned = accessible_alliances(&db, &scoped, Some("guild-b")).await?;
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, ice.id);

        assert!(can_manage_alliance(&db, "2", Some("guild-b"), ice.id).await?);
        assert!(!can_manage_alliance(&db, "2", Some("guild-b"), fire.id).await?);
        assert!(!can_manage_alliance(&db, "99", None, ice.id).await?);

        assert!(unassign_alliance(&db, "2", ice.id).await?);
        assert!(!unassign_alliance(&db, "2", ice.id).await?);

        let missing = assign_alliance(&db, "404", ice.id).await;
        assert!(matches!(missing, Err(Error::AdminNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_scoped_admin_cannot_take_foreign_members() -> Result<()> {
        let db = setup_test_db().await?;
        let global = create_test_admin(&db, "1", true).await?;
        let scoped = create_test_admin(&db, "2", false).await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        let fire = create_test_alliance(&db, "FIRE").await?;
        let frost = create_test_alliance(&db, "FROST").await?;
        assign_alliance(&db, "2", ice.id).await?;
        assign_alliance(&db, "2", frost.id).await?;
        create_test_member(&db, fire.id, "111111111", "Anna", 30).await?;
        create_test_member(&db, frost.id, "222222222", "Bert", 30).await?;

        let taken = check_member_move(&db, &scoped, None, "111111111", ice.id).await;
        assert!(matches!(taken, Err(Error::Permission { .. })));

        // Between two managed alliances, into the same alliance, or a new player
        check_member_move(&db, &scoped, None, "222222222", ice.id).await?;
        check_member_move(&db, &scoped, None, "111111111", fire.id).await?;
        check_member_move(&db, &scoped, None, "333333333", ice.id).await?;

        check_member_move(&db, &global, None, "111111111", ice.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_initial_admins_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let ids = vec!["10".to_string(), "11".to_string()];

        assert_eq!(seed_initial_admins(&db, &ids).await?, 2);
        assert_eq!(seed_initial_admins(&db, &ids).await?, 0);
        assert!(list_admins(&db).await?.iter().all(|a| a.is_global));
        Ok(())
    }
}
