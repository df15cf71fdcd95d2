//! Alliance entity - a group of players registered in a Discord server.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Alliance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alliances")]
pub struct Model {
    /// Unique identifier for the alliance
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across the bot (e.g. "ICE")
    #[sea_orm(unique)]
    pub name: String,
    /// Discord server the alliance was registered in
    pub guild_id: String,
    /// Channel receiving redemption summaries and monitor notices
    pub channel_id: Option<String>,
    /// Minutes between roster refreshes
    pub interval_minutes: i32,
    /// Queue newly added gift codes for this alliance automatically
    pub auto_redeem: bool,
    /// When the alliance was registered
    pub created_at: DateTime,
}

/// Defines relationships between Alliance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One alliance has many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
