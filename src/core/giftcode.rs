//! Gift code bookkeeping - known codes, their status and per-player outcomes.

use crate::{
    entities::{
        CodeStatus, GiftCode, RedemptionJob, RedemptionLog, gift_code, redemption_job,
        redemption_log,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Longest code accepted.
pub const MAX_CODE_LEN: usize = 32;

/// Outcome keys that mean the player has the reward and must not be retried.
pub const SUCCESS_OUTCOMES: [&str; 3] = ["success", "already_claimed", "same_type"];

/// Trims a code and rejects obviously malformed input.
///
/// Codes are case sensitive on the game side, so the case is kept.
///
/// # Errors
/// Returns [`Error::Validation`] for empty codes, codes with inner whitespace
/// and codes longer than [`MAX_CODE_LEN`].
pub fn normalize_code(raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(Error::validation("Gift code cannot be empty"));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(Error::validation("Gift code cannot contain spaces"));
    }
    if code.chars().count() > MAX_CODE_LEN {
        return Err(Error::validation(format!(
            "Gift code cannot be longer than {MAX_CODE_LEN} characters"
        )));
    }
    Ok(code.to_string())
}

/// Adds a code in the `pending` state.
///
/// Adding a known code is not an error; the existing row is returned so
/// callers can tell a fresh code from a repeat.
///
/// # Arguments
/// * `db` - Database connection
/// * `raw` - Code as typed by the user
///
/// # Returns
/// * `Ok((row, true))` - The code was inserted
/// * `Ok((row, false))` - The code was already known
///
/// # Errors
/// Returns [`Error::Validation`] when [`normalize_code`] rejects the input.
pub async fn add_gift_code(db: &DatabaseConnection, raw: &str) -> Result<(gift_code::Model, bool)> {
    let code = normalize_code(raw)?;

    if let Some(existing) = get_gift_code(db, &code).await? {
        return Ok((existing, false));
    }

    let now = chrono::Utc::now().naive_utc();
    let model = gift_code::ActiveModel {
        code: Set(code),
        added_at: Set(now),
        status: Set(CodeStatus::Pending),
        updated_at: Set(now),
    };
    let result = model.insert(db).await?;
    info!("Added gift code {}", result.code);
    Ok((result, true))
}

/// Finds a code.
pub async fn get_gift_code(db: &DatabaseConnection, code: &str) -> Result<Option<gift_code::Model>> {
    GiftCode::find_by_id(code.trim().to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// All codes, newest first.
pub async fn list_gift_codes(db: &DatabaseConnection) -> Result<Vec<gift_code::Model>> {
    GiftCode::find()
        .order_by_desc(gift_code::Column::AddedAt)
        .order_by_asc(gift_code::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The newest code that may still be redeemable.
pub async fn latest_active_code(db: &DatabaseConnection) -> Result<Option<gift_code::Model>> {
    Ok(list_gift_codes(db)
        .await?
        .into_iter()
        .find(|code| !code.status.is_dead()))
}

/// Updates the status of a code.
///
/// Setting the status a code already has is a no-op and keeps `updated_at`.
///
/// # Errors
/// Returns [`Error::GiftCodeNotFound`] when the code is unknown.
pub async fn set_status(
    db: &DatabaseConnection,
    code: &str,
    status: CodeStatus,
) -> Result<gift_code::Model> {
    let existing = get_gift_code(db, code)
        .await?
        .ok_or_else(|| Error::GiftCodeNotFound {
            code: code.to_string(),
        })?;

    if existing.status == status {
        return Ok(existing);
    }

    let mut active: gift_code::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let result = active.update(db).await?;
    info!("Gift code {} is now {}", result.code, status.as_str());
    Ok(result)
}

/// Deletes a code and any queued jobs for it. Returns whether the code existed.
pub async fn delete_gift_code(db: &DatabaseConnection, code: &str) -> Result<bool> {
    let code = code.trim();
    RedemptionJob::delete_many()
        .filter(redemption_job::Column::Code.eq(code))
        .exec(db)
        .await?;
    let result = GiftCode::delete_by_id(code.to_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Stores the latest outcome of a redemption attempt for a player.
///
/// There is one log row per player and code; a later attempt overwrites the
/// outcome and time of the earlier one.
///
/// # Arguments
/// * `db` - Database connection
/// * `fid` - Player id
/// * `code` - Gift code
/// * `outcome` - Outcome key, see [`SUCCESS_OUTCOMES`] for the final ones
pub async fn record_outcome(
    db: &DatabaseConnection,
    fid: &str,
    code: &str,
    outcome: &str,
) -> Result<redemption_log::Model> {
    let now = chrono::Utc::now().naive_utc();
    let existing = RedemptionLog::find()
        .filter(redemption_log::Column::Fid.eq(fid))
        .filter(redemption_log::Column::Code.eq(code))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        let mut active: redemption_log::ActiveModel = existing.into();
        active.outcome = Set(outcome.to_string());
        active.attempted_at = Set(now);
        return active.update(db).await.map_err(Into::into);
    }

    let entry = redemption_log::ActiveModel {
        fid: Set(fid.to_string()),
        code: Set(code.to_string()),
        outcome: Set(outcome.to_string()),
        attempted_at: Set(now),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Whether the player already holds the reward of this code.
pub async fn has_redeemed(db: &DatabaseConnection, fid: &str, code: &str) -> Result<bool> {
    let entry = RedemptionLog::find()
        .filter(redemption_log::Column::Fid.eq(fid))
        .filter(redemption_log::Column::Code.eq(code))
        .one(db)
        .await?;
    Ok(entry.is_some_and(|e| SUCCESS_OUTCOMES.contains(&e.outcome.as_str())))
}

/// Player ids that already hold the reward of this code.
pub async fn redeemed_fids(db: &DatabaseConnection, code: &str) -> Result<HashSet<String>> {
    let entries = RedemptionLog::find()
        .filter(redemption_log::Column::Code.eq(code))
        .filter(redemption_log::Column::Outcome.is_in(SUCCESS_OUTCOMES))
        .all(db)
        .await?;
    Ok(entries.into_iter().map(|e| e.fid).collect())
}

/// Number of players per outcome for a code.
pub async fn redemption_stats(db: &DatabaseConnection, code: &str) -> Result<BTreeMap<String, u64>> {
    let entries = RedemptionLog::find()
        .filter(redemption_log::Column::Code.eq(code.trim()))
        .all(db)
        .await?;

    let mut stats = BTreeMap::new();
    for entry in entries {
        *stats.entry(entry.outcome).or_insert(0) += 1;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  WOS2025 ").unwrap(), "WOS2025");
        assert!(normalize_code("").is_err());
        assert!(normalize_code("   ").is_err());
        assert!(normalize_code("WOS 2025").is_err());
        assert!(normalize_code(&"A".repeat(MAX_CODE_LEN + 1)).is_err());
        assert!(normalize_code(&"A".repeat(MAX_CODE_LEN)).is_ok());
    }

    #[tokio::test]
    async fn test_add_gift_code_is_not_duplicated() -> Result<()> {
        let db = setup_test_db().await?;

        let (first, inserted) = add_gift_code(&db, "FROST").await?;
        assert!(inserted);
        assert_eq!(first.status, CodeStatus::Pending);

        let (again, inserted) = add_gift_code(&db, " FROST ").await?;
        assert!(!inserted);
        assert_eq!(again.code, "FROST");
        assert_eq!(list_gift_codes(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_active_code_skips_dead_codes() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_gift_code(&db, "OLD").await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        create_test_gift_code(&db, "NEW").await?;

        assert_eq!(latest_active_code(&db).await?.unwrap().code, "NEW");

        set_status(&db, "NEW", CodeStatus::Expired).await?;
        assert_eq!(latest_active_code(&db).await?.unwrap().code, "OLD");

        set_status(&db, "OLD", CodeStatus::Exhausted).await?;
        assert!(latest_active_code(&db).await?.is_none());

        let missing = set_status(&db, "NOPE", CodeStatus::Valid).await;
        assert!(matches!(missing, Err(Error::GiftCodeNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_record_outcome_upserts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_gift_code(&db, "FROST").await?;

        record_outcome(&db, "111111111", "FROST", "captcha_error").await?;
        assert!(!has_redeemed(&db, "111111111", "FROST").await?);

        record_outcome(&db, "111111111", "FROST", "success").await?;
        record_outcome(&db, "222222222", "FROST", "already_claimed").await?;
        record_outcome(&db, "333333333", "FROST", "timeout").await?;

        assert!(has_redeemed(&db, "111111111", "FROST").await?);
        assert!(has_redeemed(&db, "222222222", "FROST").await?);
        assert!(!has_redeemed(&db, "333333333", "FROST").await?);

        let fids = redeemed_fids(&db, "FROST").await?;
        assert_eq!(fids.len(), 2);

        let stats = redemption_stats(&db, "FROST").await?;
        assert_eq!(stats.get("success"), Some(&1));
        assert_eq!(stats.get("already_claimed"), Some(&1));
        assert_eq!(stats.get("timeout"), Some(&1));
        assert_eq!(stats.get("captcha_error"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_gift_code() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_gift_code(&db, "FROST").await?;

        assert!(delete_gift_code(&db, "FROST").await?);
        assert!(!delete_gift_code(&db, "FROST").await?);
        assert!(get_gift_code(&db, "FROST").await?.is_none());
        Ok(())
    }
}
