//! Monitoring entity - which alliances post change notices where.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Alliance monitoring configuration model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alliance_monitoring")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord server that configured the monitor
    pub guild_id: String,
    /// Monitored alliance
    pub alliance_id: i64,
    /// Channel receiving change notices
    pub channel_id: String,
    /// Paused monitors keep their row
    pub enabled: bool,
    /// Minimum seconds between two scans of this alliance
    pub check_interval_secs: i32,
    /// Last configuration change or completed scan
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
