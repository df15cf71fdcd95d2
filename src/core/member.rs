//! Member business logic - the roster of each alliance.
//!
//! Members are keyed by their in-game id, so a player can only belong to one
//! alliance at a time; adding them elsewhere moves them.

use crate::{
    core::alliance,
    entities::{Member, member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Profile data for a player as returned by the game API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// 9-digit player id
    pub fid: String,
    /// In-game nickname
    pub nickname: String,
    /// Raw furnace level
    pub furnace_level: i32,
    /// State number
    pub kid: i32,
    /// Furnace icon URL
    pub stove_icon: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// Adds a player to an alliance, or refreshes and moves an existing member.
///
/// Permission to take a player out of their current alliance is checked by
/// [`crate::core::admin::check_member_move`], not here.
///
/// # Arguments
/// * `db` - Database connection
/// * `alliance_id` - Alliance the player joins
/// * `snapshot` - Profile fetched from the game API
///
/// # Errors
/// Returns [`Error::AllianceNotFound`] when the alliance does not exist.
pub async fn add_member(
    db: &DatabaseConnection,
    alliance_id: i64,
    snapshot: PlayerSnapshot,
) -> Result<member::Model> {
    if alliance::get_alliance_by_id(db, alliance_id).await?.is_none() {
        return Err(Error::AllianceNotFound {
            name: alliance_id.to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let existing = Member::find_by_id(snapshot.fid.clone()).one(db).await?;

    let active = member::ActiveModel {
        fid: Set(snapshot.fid),
        alliance_id: Set(alliance_id),
        nickname: Set(snapshot.nickname),
        furnace_level: Set(snapshot.furnace_level),
        kid: Set(snapshot.kid),
        stove_icon: Set(snapshot.stove_icon),
        avatar_url: Set(snapshot.avatar_url),
        updated_at: Set(now),
    };

    let result = if let Some(previous) = existing {
        if previous.alliance_id != alliance_id {
            debug!(
                "Moving member {} from alliance {} to {alliance_id}",
                previous.fid, previous.alliance_id
            );
        }
        active.update(db).await?
    } else {
        active.insert(db).await?
    };
    Ok(result)
}

/// Refreshes the stored profile of a member without changing their alliance.
pub async fn refresh_member(
    db: &DatabaseConnection,
    snapshot: &PlayerSnapshot,
) -> Result<Option<member::Model>> {
    let Some(existing) = get_member(db, &snapshot.fid).await? else {
        return Ok(None);
    };

    let mut active: member::ActiveModel = existing.into();
    active.nickname = Set(snapshot.nickname.clone());
    active.furnace_level = Set(snapshot.furnace_level);
    active.kid = Set(snapshot.kid);
    active.stove_icon = Set(snapshot.stove_icon.clone());
    active.avatar_url = Set(snapshot.avatar_url.clone());
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Some(active.update(db).await?))
}

/// Removes a member from whichever alliance holds them.
///
/// # Returns
/// * `Ok(true)` - The member was removed
/// * `Ok(false)` - No member has this id
pub async fn remove_member(db: &DatabaseConnection, fid: &str) -> Result<bool> {
    let result = Member::delete_by_id(fid.to_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Finds a member by player id.
pub async fn get_member(db: &DatabaseConnection, fid: &str) -> Result<Option<member::Model>> {
    Member::find_by_id(fid.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists an alliance's members, highest furnace first, then by nickname.
pub async fn list_members(db: &DatabaseConnection, alliance_id: i64) -> Result<Vec<member::Model>> {
    Member::find()
        .filter(member::Column::AllianceId.eq(alliance_id))
        .order_by_desc(member::Column::FurnaceLevel)
        .order_by_asc(member::Column::Nickname)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of members in an alliance.
pub async fn count_members(db: &DatabaseConnection, alliance_id: i64) -> Result<u64> {
    Member::find()
        .filter(member::Column::AllianceId.eq(alliance_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Whether the player id is registered in any alliance.
pub async fn member_exists(db: &DatabaseConnection, fid: &str) -> Result<bool> {
    Ok(get_member(db, fid).await?.is_some())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_member_requires_alliance() -> Result<()> {
        let db = setup_test_db().await?;
        let result = add_member(&db, 42, snapshot("123456789", "Ghost", 20)).await;
        assert!(matches!(result, Err(Error::AllianceNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_member_upserts_and_moves() -> Result<()> {
        let db = setup_test_db().await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        let fire = create_test_alliance(&db, "FIRE").await?;

        add_member(&db, ice.id, snapshot("123456789", "Anna", 25)).await?;
        assert_eq!(count_members(&db, ice.id).await?, 1);

        let moved = add_member(&db, fire.id, snapshot("123456789", "Anna II", 31)).await?;
        assert_eq!(moved.alliance_id, fire.id);
        assert_eq!(moved.nickname, "Anna II");
        assert_eq!(count_members(&db, ice.id).await?, 0);
        assert_eq!(count_members(&db, fire.id).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_members_order() -> Result<()> {
        let db = setup_test_db().await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        create_test_member(&db, ice.id, "111111111", "Bravo", 30).await?;
        create_test_member(&db, ice.id, "222222222", "Alpha", 30).await?;
        create_test_member(&db, ice.id, "333333333", "Zulu", 45).await?;

        let names: Vec<String> = list_members(&db, ice.id)
            .await?
            .into_iter()
            .map(|m| m.nickname)
            .collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Bravo"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_and_exists() -> Result<()> {
        let db = setup_test_db().await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        create_test_member(&db, ice.id, "111111111", "Anna", 30).await?;

        assert!(member_exists(&db, "111111111").await?);
        assert!(remove_member(&db, "111111111").await?);
        assert!(!remove_member(&db, "111111111").await?);
        assert!(!member_exists(&db, "111111111").await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_member_keeps_alliance() -> Result<()> {
        let db = setup_test_db().await?;
        let ice = create_test_alliance(&db, "ICE").await?;
        create_test_member(&db, ice.id, "111111111", "Anna", 30).await?;

        let refreshed = refresh_member(&db, &snapshot("111111111", "Annabel", 36))
            .await?
            .unwrap();
        assert_eq!(refreshed.alliance_id, ice.id);
        assert_eq!(refreshed.nickname, "Annabel");
        assert_eq!(refreshed.furnace_level, 36);

        assert!(
            refresh_member(&db, &snapshot("999999999", "Nobody", 1))
                .await?
                .is_none()
        );
        Ok(())
    }
}
