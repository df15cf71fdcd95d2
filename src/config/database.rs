//! Database configuration module for Frostkeeper.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Creation is idempotent: every statement uses `IF NOT EXISTS`, and
//! the pair constraints that `SeaORM` cannot derive are added as unique indexes.

use crate::entities::{
    Admin, AdminAlliance, AdminAllianceColumn, Alliance, GiftCode, Member, MemberHistory,
    MemberHistoryColumn, Monitoring, MonitoringColumn, RedemptionJob, RedemptionLog,
    RedemptionLogColumn, SystemState,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default location of the bot database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/frostkeeper.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// When the URL points at a local `SQLite` file its parent directory is created.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();

    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }

    info!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Directory holding the `SQLite` file of `url`, if it has one.
fn sqlite_parent_dir(url: &str) -> Option<&str> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    let (dir, _file) = path.rsplit_once('/')?;
    (!dir.is_empty()).then_some(dir)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn unique_pair<E, A, B>(name: &str, entity: E, first: A, second: B) -> IndexCreateStatement
where
    E: EntityTrait,
    A: sea_orm::ColumnTrait,
    B: sea_orm::ColumnTrait,
{
    Index::create()
        .name(name)
        .table(entity)
        .col(first)
        .col(second)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Safe to call on every start: existing tables and indexes are left alone.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Alliances before members: members carry a foreign key to alliances.
    create_table(db, &schema, Alliance).await?;
    create_table(db, &schema, Member).await?;
    create_table(db, &schema, Admin).await?;
    create_table(db, &schema, AdminAlliance).await?;
    create_table(db, &schema, GiftCode).await?;
    create_table(db, &schema, RedemptionJob).await?;
    create_table(db, &schema, RedemptionLog).await?;
    create_table(db, &schema, Monitoring).await?;
    create_table(db, &schema, MemberHistory).await?;
    create_table(db, &schema, SystemState).await?;

    let indexes = [
        unique_pair(
            "idx_admin_alliance_pair",
            AdminAlliance,
            AdminAllianceColumn::AdminId,
            AdminAllianceColumn::AllianceId,
        ),
        unique_pair(
            "idx_redemption_log_fid_code",
            RedemptionLog,
            RedemptionLogColumn::Fid,
            RedemptionLogColumn::Code,
        ),
        unique_pair(
            "idx_monitoring_guild_alliance",
            Monitoring,
            MonitoringColumn::GuildId,
            MonitoringColumn::AllianceId,
        ),
        unique_pair(
            "idx_member_history_fid_alliance",
            MemberHistory,
            MemberHistoryColumn::Fid,
            MemberHistoryColumn::AllianceId,
        ),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    debug!("Database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        admin::Model as AdminModel, alliance::Model as AllianceModel,
        gift_code::Model as GiftCodeModel, member::Model as MemberModel,
        system_state::Model as SystemStateModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<AllianceModel> = Alliance::find().limit(1).all(&db).await?;
        let _: Vec<MemberModel> = Member::find().limit(1).all(&db).await?;
        let _: Vec<AdminModel> = Admin::find().limit(1).all(&db).await?;
        let _: Vec<GiftCodeModel> = GiftCode::find().limit(1).all(&db).await?;
        let _: Vec<SystemStateModel> = SystemState::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir("sqlite://data/frostkeeper.sqlite?mode=rwc"),
            Some("data")
        );
        assert_eq!(sqlite_parent_dir("sqlite://bot.sqlite"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
    }
}
