//! Shared test utilities for Frostkeeper.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{admin, alliance, giftcode, member, member::PlayerSnapshot},
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test alliance in server `"guild-a"` with a 60 minute interval.
pub async fn create_test_alliance(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::alliance::Model> {
    create_alliance_in_guild(db, name, "guild-a").await
}

/// Creates a test alliance in a specific server.
pub async fn create_alliance_in_guild(
    db: &DatabaseConnection,
    name: &str,
    guild_id: &str,
) -> Result<entities::alliance::Model> {
    alliance::create_alliance(db, name, guild_id, None, 60).await
}

/// Builds a player profile with state 1234 and no images.
#[must_use]
pub fn snapshot(fid: &str, nickname: &str, furnace_level: i32) -> PlayerSnapshot {
    PlayerSnapshot {
        fid: fid.to_string(),
        nickname: nickname.to_string(),
        furnace_level,
        kid: 1234,
        stove_icon: None,
        avatar_url: None,
    }
}

/// Registers a test member in an alliance.
pub async fn create_test_member(
    db: &DatabaseConnection,
    alliance_id: i64,
    fid: &str,
    nickname: &str,
    furnace_level: i32,
) -> Result<entities::member::Model> {
    member::add_member(db, alliance_id, snapshot(fid, nickname, furnace_level)).await
}

/// Creates a test admin.
pub async fn create_test_admin(
    db: &DatabaseConnection,
    user_id: &str,
    is_global: bool,
) -> Result<entities::admin::Model> {
    admin::add_admin(db, user_id, is_global).await
}

/// Adds a pending gift code.
pub async fn create_test_gift_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::gift_code::Model> {
    let (model, _) = giftcode::add_gift_code(db, code).await?;
    Ok(model)
}
