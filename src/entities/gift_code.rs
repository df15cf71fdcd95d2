//! Gift code entity - codes known to the bot and what the game said about them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a gift code as learned from redemption attempts.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    /// Not tried yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// At least one player redeemed it
    #[sea_orm(string_value = "valid")]
    Valid,
    /// The game does not know the code
    #[sea_orm(string_value = "invalid")]
    Invalid,
    /// The code's time window has passed
    #[sea_orm(string_value = "expired")]
    Expired,
    /// The code's usage limit was reached
    #[sea_orm(string_value = "exhausted")]
    Exhausted,
}

impl CodeStatus {
    /// Whether no further redemption can succeed with this code.
    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Invalid | Self::Expired | Self::Exhausted)
    }

    /// Lowercase label used in embeds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Gift code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gift_codes")]
pub struct Model {
    /// The code as typed in game
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    /// When the code was added
    pub added_at: DateTime,
    /// Current status
    pub status: CodeStatus,
    /// Last status change
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
