//! Redemption log entity - last outcome per player and code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption outcome model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "redemption_log")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Player id
    pub fid: String,
    /// Gift code
    pub code: String,
    /// Outcome key (e.g. `success`, `already_claimed`, `captcha_error`)
    pub outcome: String,
    /// When the attempt finished
    pub attempted_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
