//! Member entity - a player registered to an alliance, keyed by in-game id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// 9-digit player id
    #[sea_orm(primary_key, auto_increment = false)]
    pub fid: String,
    /// Alliance the player belongs to
    pub alliance_id: i64,
    /// In-game nickname at the last refresh
    pub nickname: String,
    /// Raw furnace level reported by the game
    pub furnace_level: i32,
    /// State (server) number
    pub kid: i32,
    /// Furnace icon URL for fire crystal levels
    pub stove_icon: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Last time the row was refreshed
    pub updated_at: DateTime,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member belongs to one alliance
    #[sea_orm(
        belongs_to = "super::alliance::Entity",
        from = "Column::AllianceId",
        to = "super::alliance::Column::Id"
    )]
    Alliance,
}

impl Related<super::alliance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alliance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
