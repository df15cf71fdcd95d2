//! Key-value bookkeeping in the `system_state` table.

use crate::{
    entities::{SystemState, system_state},
    errors::Result,
};
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};

/// Key holding the RFC 3339 time of the last completed monitor sweep.
pub const MONITOR_LAST_SWEEP: &str = "monitor.last_sweep";

/// Key holding the RFC 3339 time of the last finished redemption job.
pub const REDEMPTION_LAST_JOB: &str = "redemption.last_job";

/// Retrieves a value from the key-value `system_state` table.
///
/// Returns `Ok(None)` if the key does not exist.
#[instrument(skip(db))]
pub async fn get_state_value(db: &DatabaseConnection, key: &str) -> Result<Option<String>> {
    let row = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;
    debug!("System state for key '{}': {:?}", key, row.as_ref().map(|r| &r.value));
    Ok(row.map(|r| r.value))
}

/// Sets or updates a value in the key-value `system_state` table.
#[instrument(skip(db))]
pub async fn set_state_value(db: &DatabaseConnection, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().naive_utc();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        let mut active: system_state::ActiveModel = existing.into();
        active.value = Set(value.to_string());
        active.updated_at = Set(now);
        active.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Stores the current time under `key`.
pub async fn touch(db: &DatabaseConnection, key: &str) -> Result<()> {
    set_state_value(db, key, &chrono::Utc::now().to_rfc3339()).await
}

/// Reads a time stored by [`touch`]. Unparseable values read as `None`.
pub async fn get_timestamp(
    db: &DatabaseConnection,
    key: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    Ok(get_state_value(db, key).await?.and_then(|value| {
        chrono::DateTime::parse_from_rfc3339(&value)
            .ok()
            .map(|time| time.with_timezone(&chrono::Utc))
    }))
}
