//! Member history entity - last observed profile of a monitored player.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member snapshot model used for change detection
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "member_history")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Player id
    pub fid: String,
    /// Alliance the snapshot was taken for
    pub alliance_id: i64,
    /// Nickname at the last scan
    pub nickname: String,
    /// Furnace level at the last scan
    pub furnace_level: i32,
    /// Avatar URL at the last scan
    pub avatar_url: Option<String>,
    /// When the snapshot was taken
    pub last_checked: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
