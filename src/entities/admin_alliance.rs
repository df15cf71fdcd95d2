//! Assignment of a scoped admin to an alliance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin/alliance assignment model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_alliances")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user id of the admin
    pub admin_id: String,
    /// Assigned alliance
    pub alliance_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
