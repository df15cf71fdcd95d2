//! Redemption job entity - one queued (code, alliance) pair.
//!
//! Rows are deleted once the worker finishes them, so anything left at startup
//! is work that was interrupted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Queued redemption job model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "redemption_jobs")]
pub struct Model {
    /// Monotonic id, also the queue order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Gift code to redeem
    pub code: String,
    /// Alliance whose members receive the code
    pub alliance_id: i64,
    /// Discord user who queued the job, `None` for auto-redeem
    pub requested_by: Option<String>,
    /// When the job was queued
    pub queued_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
