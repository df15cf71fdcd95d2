//! Persisted redemption queue rows.
//!
//! The worker in [`crate::service::redemption`] owns the processing; this
//! module only stores, orders and summarizes the jobs.

use crate::{
    entities::{RedemptionJob, redemption_job},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Snapshot of the queue for `/giftcode queue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatus {
    /// Number of jobs waiting, including the one in flight
    pub queue_length: usize,
    /// `(code, number of alliances)`, most recently queued code first
    pub items: Vec<(String, usize)>,
}

/// Queues a code for several alliances.
///
/// All jobs are inserted in one transaction, in the order of `alliance_ids`,
/// behind every job that is already waiting.
///
/// # Arguments
/// * `db` - Database connection
/// * `code` - Normalised gift code
/// * `alliance_ids` - Alliances to redeem for
/// * `requested_by` - Discord user id, `None` for automatic redemption
///
/// # Returns
/// * `Ok(positions)` - The 1-based position of each new job in the global queue
///
/// # Errors
/// Returns [`Error::Validation`] when `alliance_ids` is empty.
pub async fn enqueue(
    db: &DatabaseConnection,
    code: &str,
    alliance_ids: &[i64],
    requested_by: Option<String>,
) -> Result<Vec<usize>> {
    if alliance_ids.is_empty() {
        return Err(Error::validation("No alliances selected"));
    }

    let txn = db.begin().await?;
    let waiting = usize::try_from(RedemptionJob::find().count(&txn).await?).unwrap_or(usize::MAX);
    let now = chrono::Utc::now().naive_utc();

    let mut positions = Vec::with_capacity(alliance_ids.len());
    for (offset, alliance_id) in alliance_ids.iter().enumerate() {
        redemption_job::ActiveModel {
            code: Set(code.to_string()),
            alliance_id: Set(*alliance_id),
            requested_by: Set(requested_by.clone()),
            queued_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        positions.push(waiting.saturating_add(offset + 1));
    }

    txn.commit().await?;
    Ok(positions)
}

/// Oldest waiting job.
pub async fn next_job(db: &DatabaseConnection) -> Result<Option<redemption_job::Model>> {
    RedemptionJob::find()
        .order_by_asc(redemption_job::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Removes a finished job.
pub async fn complete_job(db: &DatabaseConnection, job_id: i64) -> Result<()> {
    RedemptionJob::delete_by_id(job_id).exec(db).await?;
    Ok(())
}

/// Every waiting job in queue order.
pub async fn pending_jobs(db: &DatabaseConnection) -> Result<Vec<redemption_job::Model>> {
    RedemptionJob::find()
        .order_by_asc(redemption_job::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Groups the waiting jobs by code.
///
/// Codes appear in the order their first job was queued.
pub async fn queue_status(db: &DatabaseConnection) -> Result<QueueStatus> {
    let jobs = pending_jobs(db).await?;

    // (code, count, newest id)
    let mut grouped: Vec<(String, usize, i64)> = Vec::new();
    for job in &jobs {
        if let Some(entry) = grouped.iter_mut().find(|(code, _, _)| *code == job.code) {
            entry.1 += 1;
            entry.2 = entry.2.max(job.id);
        } else {
            grouped.push((job.code.clone(), 1, job.id));
        }
    }
    grouped.sort_by(|a, b| b.2.cmp(&a.2));

    Ok(QueueStatus {
        queue_length: jobs.len(),
        items: grouped
            .into_iter()
            .map(|(code, count, _)| (code, count))
            .collect(),
    })
}
