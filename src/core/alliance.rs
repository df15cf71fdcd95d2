//! Alliance business logic - registration, lookup, editing and removal.
//!
//! Names are unique regardless of case, so "ICE" and "ice" refer to the same
//! alliance everywhere a user types a name.

use crate::{
    entities::{
        Alliance, AdminAlliance, Member, MemberHistory, Monitoring, RedemptionJob,
        admin_alliance, alliance, member, member_history, monitoring, redemption_job,
    },
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Default roster refresh interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: i32 = 60;

/// Fields that can be changed with `/alliance edit`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AllianceUpdate {
    /// New display name
    pub name: Option<String>,
    /// New notice channel; `Some(None)` clears it
    pub channel_id: Option<Option<String>>,
    /// New refresh interval
    pub interval_minutes: Option<i32>,
    /// Toggle automatic redemption of new codes
    pub auto_redeem: Option<bool>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Alliance name cannot be empty"));
    }
    if trimmed.chars().count() > 64 {
        return Err(Error::validation(
            "Alliance name cannot be longer than 64 characters",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_interval(minutes: i32) -> Result<i32> {
    if minutes <= 0 {
        return Err(Error::validation("Interval must be a positive number of minutes"));
    }
    Ok(minutes)
}

/// Registers a new alliance in the given Discord server.
///
/// The name is trimmed and must be unique ignoring case. New alliances start
/// with auto-redeem switched off.
///
/// # Arguments
/// * `db` - Database connection
/// * `name` - Alliance name, at most 64 characters
/// * `guild_id` - Discord server the alliance belongs to
/// * `channel_id` - Channel for redemption reports, if any
/// * `interval_minutes` - Roster refresh interval, must be positive
///
/// # Errors
/// * [`Error::Validation`] - Empty or overlong name, non-positive interval
/// * [`Error::AllianceExists`] - The name is taken
pub async fn create_alliance(
    db: &DatabaseConnection,
    name: &str,
    guild_id: &str,
    channel_id: Option<String>,
    interval_minutes: i32,
) -> Result<alliance::Model> {
    let name = validate_name(name)?;
    let interval_minutes = validate_interval(interval_minutes)?;

    if get_alliance_by_name(db, &name).await?.is_some() {
        return Err(Error::AllianceExists { name });
    }

    let alliance = alliance::ActiveModel {
        name: Set(name),
        guild_id: Set(guild_id.to_string()),
        channel_id: Set(channel_id),
        interval_minutes: Set(interval_minutes),
        auto_redeem: Set(false),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    let result = alliance.insert(db).await?;
    info!("Created alliance '{}' (id {})", result.name, result.id);
    Ok(result)
}

/// Finds an alliance by its id.
pub async fn get_alliance_by_id<C>(db: &C, alliance_id: i64) -> Result<Option<alliance::Model>>
where
    C: ConnectionTrait,
{
    Alliance::find_by_id(alliance_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an alliance by name, ignoring case and surrounding whitespace.
pub async fn get_alliance_by_name<C>(db: &C, name: &str) -> Result<Option<alliance::Model>>
where
    C: ConnectionTrait,
{
    Alliance::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(alliance::Column::Name)))
                .eq(name.trim().to_lowercase()),
        )
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_alliance_by_name`] but a missing alliance is an error.
pub async fn require_alliance_by_name<C>(db: &C, name: &str) -> Result<alliance::Model>
where
    C: ConnectionTrait,
{
    get_alliance_by_name(db, name)
        .await?
        .ok_or_else(|| Error::AllianceNotFound {
            name: name.trim().to_string(),
        })
}

/// Retrieves all alliances, ordered alphabetically by name.
pub async fn list_alliances(db: &DatabaseConnection) -> Result<Vec<alliance::Model>> {
    Alliance::find()
        .order_by_asc(alliance::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the alliances registered in one Discord server.
pub async fn list_alliances_for_guild(
    db: &DatabaseConnection,
    guild_id: &str,
) -> Result<Vec<alliance::Model>> {
    Alliance::find()
        .filter(alliance::Column::GuildId.eq(guild_id))
        .order_by_asc(alliance::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Alliances with `auto_redeem` enabled.
pub async fn list_auto_redeem_alliances(db: &DatabaseConnection) -> Result<Vec<alliance::Model>> {
    Alliance::find()
        .filter(alliance::Column::AutoRedeem.eq(true))
        .order_by_asc(alliance::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies an [`AllianceUpdate`] and returns the updated alliance.
///
/// Renames go through the same validation as [`create_alliance`]; renaming an
/// alliance to its own name in a different case is allowed.
///
/// # Errors
/// * [`Error::AllianceNotFound`] - No alliance has this id
/// * [`Error::AllianceExists`] - Another alliance already uses the new name
/// * [`Error::Validation`] - Invalid name or interval
pub async fn update_alliance(
    db: &DatabaseConnection,
    alliance_id: i64,
    update: AllianceUpdate,
) -> Result<alliance::Model> {
    let existing = get_alliance_by_id(db, alliance_id)
        .await?
        .ok_or_else(|| Error::AllianceNotFound {
            name: alliance_id.to_string(),
        })?;

    let mut active: alliance::ActiveModel = existing.clone().into();

    if let Some(name) = update.name {
        let name = validate_name(&name)?;
        if let Some(other) = get_alliance_by_name(db, &name).await?
            && other.id != existing.id
        {
            return Err(Error::AllianceExists { name });
        }
        active.name = Set(name);
    }
    if let Some(channel_id) = update.channel_id {
        active.channel_id = Set(channel_id);
    }
    if let Some(minutes) = update.interval_minutes {
        active.interval_minutes = Set(validate_interval(minutes)?);
    }
    if let Some(auto_redeem) = update.auto_redeem {
        active.auto_redeem = Set(auto_redeem);
    }

    active.update(db).await.map_err(Into::into)
}

/// Deletes an alliance together with everything that references it.
///
/// Members, admin assignments, monitors, member history and queued jobs go in
/// the same transaction as the alliance row.
///
/// # Arguments
/// * `db` - Database connection
/// * `alliance_id` - Alliance to delete
///
/// # Returns
/// * `Ok(n)` - The number of members that were removed
///
/// # Errors
/// Returns [`Error::AllianceNotFound`] when no alliance has this id.
pub async fn delete_alliance(db: &DatabaseConnection, alliance_id: i64) -> Result<u64> {
    let txn = db.begin().await?;

    let existing = get_alliance_by_id(&txn, alliance_id)
        .await?
        .ok_or_else(|| Error::AllianceNotFound {
            name: alliance_id.to_string(),
        })?;

    let removed_members = Member::delete_many()
        .filter(member::Column::AllianceId.eq(alliance_id))
        .exec(&txn)
        .await?
        .rows_affected;
    AdminAlliance::delete_many()
        .filter(admin_alliance::Column::AllianceId.eq(alliance_id))
        .exec(&txn)
        .await?;
    Monitoring::delete_many()
        .filter(monitoring::Column::AllianceId.eq(alliance_id))
        .exec(&txn)
        .await?;
    MemberHistory::delete_many()
        .filter(member_history::Column::AllianceId.eq(alliance_id))
        .exec(&txn)
        .await?;
    RedemptionJob::delete_many()
        .filter(redemption_job::Column::AllianceId.eq(alliance_id))
        .exec(&txn)
        .await?;
    Alliance::delete_by_id(alliance_id).exec(&txn).await?;

    txn.commit().await?;

    info!(
        "Deleted alliance '{}' and {removed_members} member(s)",
        existing.name
    );
    Ok(removed_members)
}

/// Every alliance with its member count, ordered by name.
pub async fn list_alliances_with_counts(
    db: &DatabaseConnection,
) -> Result<Vec<(alliance::Model, u64)>> {
    let alliances = list_alliances(db).await?;
    let mut result = Vec::with_capacity(alliances.len());
    for alliance in alliances {
        let count = Member::find()
            .filter(member::Column::AllianceId.eq(alliance.id))
            .count(db)
            .await?;
        result.push((alliance, count));
    }
    Ok(result)
}
