//! Alliance monitoring - configuration rows, member snapshots and change detection.
//!
//! The scanning loop lives in [`crate::service::monitor`]; everything here is
//! storage and pure comparison so it can be tested without the game API.

use crate::{
    core::member::PlayerSnapshot,
    entities::{MemberHistory, Monitoring, member_history, monitoring},
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashMap;

/// Default seconds between scans of one alliance.
pub const DEFAULT_CHECK_INTERVAL_SECS: i32 = 300;

/// A difference between the stored snapshot and the fresh profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberChange {
    /// The player renamed
    NameChange {
        /// Player id
        fid: String,
        /// Previous nickname
        old: String,
        /// Current nickname
        new: String,
    },
    /// The furnace level moved
    FurnaceChange {
        /// Player id
        fid: String,
        /// Current nickname
        nickname: String,
        /// Previous level
        old: i32,
        /// Current level
        new: i32,
        /// Whether the level went up
        upgrade: bool,
    },
    /// The player picked a new avatar
    AvatarChange {
        /// Player id
        fid: String,
        /// Current nickname
        nickname: String,
        /// Previous avatar URL
        old: String,
        /// Current avatar URL
        new: String,
    },
}

impl MemberChange {
    /// Player id the change belongs to.
    #[must_use]
    pub fn fid(&self) -> &str {
        match self {
            Self::NameChange { fid, .. }
            | Self::FurnaceChange { fid, .. }
            | Self::AvatarChange { fid, .. } => fid,
        }
    }

    /// Short label used as embed title.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NameChange { .. } => "Name change",
            Self::FurnaceChange { upgrade: true, .. } => "Furnace upgrade",
            Self::FurnaceChange { upgrade: false, .. } => "Furnace change",
            Self::AvatarChange { .. } => "Avatar change",
        }
    }
}

/// Compares a stored snapshot with a fresh profile.
///
/// A player seen for the first time produces no changes. Avatar changes are
/// only reported when both the old and the new URL are known.
///
/// # Arguments
/// * `history` - Last stored snapshot of the player, if any
/// * `fresh` - Profile just fetched from the game API
///
/// # Returns
/// Name, furnace and avatar changes, in that order.
#[must_use]
pub fn detect_changes(
    history: Option<&member_history::Model>,
    fresh: &PlayerSnapshot,
) -> Vec<MemberChange> {
    let Some(previous) = history else {
        return Vec::new();
    };

    let mut changes = Vec::new();

    if previous.nickname != fresh.nickname {
        changes.push(MemberChange::NameChange {
            fid: fresh.fid.clone(),
            old: previous.nickname.clone(),
            new: fresh.nickname.clone(),
        });
    }

    if previous.furnace_level != fresh.furnace_level {
        changes.push(MemberChange::FurnaceChange {
            fid: fresh.fid.clone(),
            nickname: fresh.nickname.clone(),
            old: previous.furnace_level,
            new: fresh.furnace_level,
            upgrade: fresh.furnace_level > previous.furnace_level,
        });
    }

    let old_avatar = previous.avatar_url.as_deref().unwrap_or_default();
    let new_avatar = fresh.avatar_url.as_deref().unwrap_or_default();
    if !old_avatar.is_empty() && !new_avatar.is_empty() && old_avatar != new_avatar {
        changes.push(MemberChange::AvatarChange {
            fid: fresh.fid.clone(),
            nickname: fresh.nickname.clone(),
            old: old_avatar.to_string(),
            new: new_avatar.to_string(),
        });
    }

    changes
}

/// Enables (or reconfigures) monitoring of an alliance in a server.
///
/// There is at most one monitor per server and alliance; calling this again
/// changes its channel and interval and re-enables it.
///
/// # Arguments
/// * `db` - Database connection
/// * `guild_id` - Server the changes are posted in
/// * `alliance_id` - Alliance to watch
/// * `channel_id` - Channel receiving change embeds
/// * `check_interval_secs` - Seconds between scans, at least 60
///
/// # Errors
/// Returns [`Error::Validation`] for intervals shorter than a minute.
pub async fn set_monitoring(
    db: &DatabaseConnection,
    guild_id: &str,
    alliance_id: i64,
    channel_id: &str,
    check_interval_secs: i32,
) -> Result<monitoring::Model> {
    if check_interval_secs < 60 {
        return Err(Error::validation("Check interval must be at least 60 seconds"));
    }

    let now = chrono::Utc::now().naive_utc();
    let existing = Monitoring::find()
        .filter(monitoring::Column::GuildId.eq(guild_id))
        .filter(monitoring::Column::AllianceId.eq(alliance_id))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        let mut active: monitoring::ActiveModel = existing.into();
        active.channel_id = Set(channel_id.to_string());
        active.enabled = Set(true);
        active.check_interval_secs = Set(check_interval_secs);
        active.updated_at = Set(now);
        return active.update(db).await.map_err(Into::into);
    }

    monitoring::ActiveModel {
        guild_id: Set(guild_id.to_string()),
        alliance_id: Set(alliance_id),
        channel_id: Set(channel_id.to_string()),
        enabled: Set(true),
        check_interval_secs: Set(check_interval_secs),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Pauses monitoring. Returns whether an enabled monitor was found.
pub async fn disable_monitoring(
    db: &DatabaseConnection,
    guild_id: &str,
    alliance_id: i64,
) -> Result<bool> {
    let existing = Monitoring::find()
        .filter(monitoring::Column::GuildId.eq(guild_id))
        .filter(monitoring::Column::AllianceId.eq(alliance_id))
        .filter(monitoring::Column::Enabled.eq(true))
        .one(db)
        .await?;

    let Some(existing) = existing else {
        return Ok(false);
    };
    let mut active: monitoring::ActiveModel = existing.into();
    active.enabled = Set(false);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await?;
    Ok(true)
}

/// Every enabled monitor.
pub async fn list_enabled(db: &DatabaseConnection) -> Result<Vec<monitoring::Model>> {
    Monitoring::find()
        .filter(monitoring::Column::Enabled.eq(true))
        .order_by_asc(monitoring::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Monitors configured in one server, enabled or not.
pub async fn monitoring_for_guild(
    db: &DatabaseConnection,
    guild_id: &str,
) -> Result<Vec<monitoring::Model>> {
    Monitoring::find()
        .filter(monitoring::Column::GuildId.eq(guild_id))
        .order_by_asc(monitoring::Column::AllianceId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether a monitor's own interval has elapsed since its last scan.
#[must_use]
pub fn is_due(row: &monitoring::Model, now: NaiveDateTime) -> bool {
    (now - row.updated_at).num_seconds() >= i64::from(row.check_interval_secs)
}

/// Records that a monitor finished a scan.
pub async fn mark_checked(db: &DatabaseConnection, monitoring_id: i64) -> Result<()> {
    if let Some(existing) = Monitoring::find_by_id(monitoring_id).one(db).await? {
        let mut active: monitoring::ActiveModel = existing.into();
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        active.update(db).await?;
    }
    Ok(())
}

/// Stored snapshots of an alliance, keyed by player id.
pub async fn history_for_alliance(
    db: &DatabaseConnection,
    alliance_id: i64,
) -> Result<HashMap<String, member_history::Model>> {
    let rows = MemberHistory::find()
        .filter(member_history::Column::AllianceId.eq(alliance_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| (row.fid.clone(), row)).collect())
}

/// Stores the latest snapshot of a player for an alliance.
pub async fn record_snapshot(
    db: &DatabaseConnection,
    alliance_id: i64,
    snapshot: &PlayerSnapshot,
) -> Result<member_history::Model> {
    let now = chrono::Utc::now().naive_utc();
    let existing = MemberHistory::find()
        .filter(member_history::Column::Fid.eq(snapshot.fid.as_str()))
        .filter(member_history::Column::AllianceId.eq(alliance_id))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        let mut active: member_history::ActiveModel = existing.into();
        active.nickname = Set(snapshot.nickname.clone());
        active.furnace_level = Set(snapshot.furnace_level);
        active.avatar_url = Set(snapshot.avatar_url.clone());
        active.last_checked = Set(now);
        return active.update(db).await.map_err(Into::into);
    }

    member_history::ActiveModel {
        fid: Set(snapshot.fid.clone()),
        alliance_id: Set(alliance_id),
        nickname: Set(snapshot.nickname.clone()),
        furnace_level: Set(snapshot.furnace_level),
        avatar_url: Set(snapshot.avatar_url.clone()),
        last_checked: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
