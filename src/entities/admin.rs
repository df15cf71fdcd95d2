//! Admin entity - Discord users allowed to manage the bot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    /// Discord user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Global admins see every alliance; scoped admins only their assignments
    pub is_global: bool,
    /// When the admin was added
    pub created_at: DateTime,
}

/// `Admin` relations are resolved through `admin_alliance`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
