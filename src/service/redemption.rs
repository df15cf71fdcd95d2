//! The redemption queue worker.
//!
//! Jobs are rows in `redemption_jobs`, so a restart resumes where the previous
//! process stopped. One worker drains them strictly in order: a job redeems
//! one code for every member of one alliance.

use crate::{
    core::{
        alliance, giftcode, member,
        queue::{self, QueueStatus},
        state,
    },
    entities::{CodeStatus, redemption_job},
    errors::Result,
    service::{Announcement, ChannelSink},
    wos::{RedeemOutcome, Redeemer},
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome key recorded when the API call itself failed.
const ERROR_OUTCOME: &str = "error";

/// Pause after a database failure in the worker loop.
const FAILURE_PAUSE: Duration = Duration::from_secs(5);

/// Progress of the job currently being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentJob {
    /// Code being redeemed
    pub code: String,
    /// Alliance being processed
    pub alliance_name: String,
    /// Members handled so far
    pub processed: usize,
    /// Members in the alliance
    pub total: usize,
}

/// What `/giftcode queue` shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionStatus {
    /// Waiting rows
    pub queue: QueueStatus,
    /// Whether the worker is busy
    pub processing: bool,
    /// The job in flight
    pub current: Option<CurrentJob>,
}

/// Result of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Code that was redeemed
    pub code: String,
    /// Alliance that was processed
    pub alliance_name: String,
    /// Members in the alliance
    pub total: usize,
    /// Members that already held the reward
    pub skipped: usize,
    /// Count per outcome key
    pub outcomes: BTreeMap<String, usize>,
    /// The code-level outcome that ended the job early
    pub stopped_by: Option<String>,
}

impl JobSummary {
    fn count(&self, key: &str) -> usize {
        self.outcomes.get(key).copied().unwrap_or_default()
    }

    /// Embed posted to the alliance channel.
    #[must_use]
    pub fn to_announcement(&self) -> Announcement {
        let redeemed = self.count(RedeemOutcome::Success.key());
        let claimed = self.count(RedeemOutcome::AlreadyClaimed.key())
            + self.count(RedeemOutcome::SameType.key())
            + self.skipped;
        let failed: usize = self
            .outcomes
            .iter()
            .filter(|(key, _)| !giftcode::SUCCESS_OUTCOMES.contains(&key.as_str()))
            .map(|(_, n)| n)
            .sum();

        let mut description = format!(
            "✅ Redeemed: **{redeemed}**\n🔁 Already claimed: **{claimed}**\n❌ Failed: **{failed}**"
        );
        if let Some(reason) = &self.stopped_by {
            description.push_str(&format!("\n\n⛔ Stopped early: {reason}"));
        }

        let color = if self.stopped_by.is_some() {
            0x00E7_4C3C
        } else if failed == 0 {
            0x002E_CC71
        } else {
            0x00F1_C40F
        };

        Announcement {
            title: format!("🎁 Gift code {} for {}", self.code, self.alliance_name),
            description,
            color,
            fields: vec![("Members".to_string(), self.total.to_string(), true)],
            ..Announcement::default()
        }
    }
}

struct Worker {
    db: DatabaseConnection,
    redeemer: Arc<Redeemer>,
    sink: Arc<dyn ChannelSink>,
    member_delay: Duration,
    wake: Arc<Notify>,
    current: Arc<RwLock<Option<CurrentJob>>>,
}

/// Handle to the redemption worker. Cheap to clone.
#[derive(Clone)]
pub struct RedemptionQueue {
    db: DatabaseConnection,
    wake: Arc<Notify>,
    current: Arc<RwLock<Option<CurrentJob>>>,
}

impl RedemptionQueue {
    /// Spawns the worker. Jobs left over from a previous run are picked up first.
    pub fn start(
        db: DatabaseConnection,
        redeemer: Arc<Redeemer>,
        sink: Arc<dyn ChannelSink>,
        member_delay: Duration,
    ) -> (Self, JoinHandle<()>) {
        let wake = Arc::new(Notify::new());
        let current = Arc::new(RwLock::new(None));
        let worker = Worker {
            db: db.clone(),
            redeemer,
            sink,
            member_delay,
            wake: Arc::clone(&wake),
            current: Arc::clone(&current),
        };
        let handle = tokio::spawn(worker.run());
        (Self { db, wake, current }, handle)
    }

    /// Queues `code` for each alliance and wakes the worker.
    ///
    /// Returns the queue position of every new job.
    pub async fn enqueue(
        &self,
        code: &str,
        alliance_ids: &[i64],
        requested_by: Option<String>,
    ) -> Result<Vec<usize>> {
        let positions = queue::enqueue(&self.db, code, alliance_ids, requested_by).await?;
        info!("Queued {code} for {} alliance(s)", alliance_ids.len());
        self.wake.notify_one();
        Ok(positions)
    }

    /// Queues a freshly added code for every alliance with auto-redeem on.
    pub async fn enqueue_auto_redeem(&self, code: &str) -> Result<Vec<usize>> {
        let ids: Vec<i64> = alliance::list_auto_redeem_alliances(&self.db)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.enqueue(code, &ids, None).await
    }

    /// Waiting jobs and the job in flight.
    pub async fn status(&self) -> Result<RedemptionStatus> {
        let queue = queue::queue_status(&self.db).await?;
        let current = self.current.read().await.clone();
        Ok(RedemptionStatus {
            queue,
            processing: current.is_some(),
            current,
        })
    }
}

impl Worker {
    async fn run(self) {
        match queue::pending_jobs(&self.db).await {
            Ok(jobs) if !jobs.is_empty() => info!("Resuming {} queued redemption job(s)", jobs.len()),
            Ok(_) => {}
            Err(e) => error!("Failed to read redemption queue: {e}"),
        }

        loop {
            match queue::next_job(&self.db).await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    if let Err(e) = self.process(job).await {
                        error!("Redemption job {job_id} failed: {e}");
                    }
                    *self.current.write().await = None;
                    if let Err(e) = queue::complete_job(&self.db, job_id).await {
                        error!("Failed to remove redemption job {job_id}: {e}");
                        tokio::time::sleep(FAILURE_PAUSE).await;
                    }
                    if let Err(e) = state::touch(&self.db, state::REDEMPTION_LAST_JOB).await {
                        warn!("Failed to record redemption timestamp: {e}");
                    }
                }
                Ok(None) => self.wake.notified().await,
                Err(e) => {
                    error!("Failed to fetch next redemption job: {e}");
                    tokio::time::sleep(FAILURE_PAUSE).await;
                }
            }
        }
    }

    /// Runs one job and posts its summary. Returns `None` when the job was skipped.
    async fn process(&self, job: redemption_job::Model) -> Result<Option<JobSummary>> {
        let Some(code) = giftcode::get_gift_code(&self.db, &job.code).await? else {
            debug!("Skipping job {}: code {} was deleted", job.id, job.code);
            return Ok(None);
        };
        if code.status.is_dead() {
            info!(
                "Skipping job {}: code {} is {}",
                job.id,
                code.code,
                code.status.as_str()
            );
            return Ok(None);
        }
        let Some(target) = alliance::get_alliance_by_id(&self.db, job.alliance_id).await? else {
            debug!("Skipping job {}: alliance {} is gone", job.id, job.alliance_id);
            return Ok(None);
        };

        let members = member::list_members(&self.db, target.id).await?;
        let already = giftcode::redeemed_fids(&self.db, &code.code).await?;
        let mut summary = JobSummary {
            code: code.code.clone(),
            alliance_name: target.name.clone(),
            total: members.len(),
            ..JobSummary::default()
        };
        info!(
            "Redeeming {} for {} ({} members)",
            code.code,
            target.name,
            members.len()
        );

        let mut status = code.status;
        for (index, player) in members.iter().enumerate() {
            *self.current.write().await = Some(CurrentJob {
                code: code.code.clone(),
                alliance_name: target.name.clone(),
                processed: index,
                total: members.len(),
            });

            if already.contains(&player.fid) {
                summary.skipped += 1;
                continue;
            }

            let key = match self.redeemer.attempt(&player.fid, &code.code).await {
                Ok(outcome) => {
                    if let Some(dead) = outcome.code_status() {
                        giftcode::record_outcome(&self.db, &player.fid, &code.code, outcome.key())
                            .await?;
                        giftcode::set_status(&self.db, &code.code, dead).await?;
                        *summary.outcomes.entry(outcome.key().to_string()).or_default() += 1;
                        summary.stopped_by = Some(outcome.to_string());
                        break;
                    }
                    if outcome == RedeemOutcome::Success && status != CodeStatus::Valid {
                        giftcode::set_status(&self.db, &code.code, CodeStatus::Valid).await?;
                        status = CodeStatus::Valid;
                    }
                    outcome.key()
                }
                Err(e) => {
                    warn!("{} / {}: {e}", player.fid, code.code);
                    ERROR_OUTCOME
                }
            };
            giftcode::record_outcome(&self.db, &player.fid, &code.code, key).await?;
            *summary.outcomes.entry(key.to_string()).or_default() += 1;

            if !self.member_delay.is_zero() {
                tokio::time::sleep(self.member_delay).await;
            }
        }

        if let Some(channel_id) = &target.channel_id
            && let Err(e) = self.sink.post(channel_id, summary.to_announcement()).await
        {
            warn!("Failed to post redemption summary: {e}");
        }
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::app::CaptchaConfig;
    use crate::core::alliance::AllianceUpdate;
    use crate::service::tests::RecordingSink;
    use crate::test_utils::*;
    use crate::wos::redeem::tests::{FakeApi, FakeSolver, fast_redemption_config};

    struct Fixture {
        db: DatabaseConnection,
        api: Arc<FakeApi>,
        sink: Arc<RecordingSink>,
        worker: Worker,
        alliance_id: i64,
    }

    async fn fixture(replies: &[&'static str]) -> Result<Fixture> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let target = create_test_alliance(&db, "ICE").await?;
        alliance::update_alliance(
            &db,
            target.id,
            AllianceUpdate {
                channel_id: Some(Some("42".to_string())),
                ..AllianceUpdate::default()
            },
        )
        .await?;
        create_test_member(&db, target.id, "111111111", "Anna", 30).await?;
        create_test_member(&db, target.id, "222222222", "Bjorn", 25).await?;
        create_test_member(&db, target.id, "333333333", "Cleo", 20).await?;
        create_test_gift_code(&db, "FROST2025").await?;

        let api = Arc::new(FakeApi::scripted(replies));
        let redeemer = Arc::new(Redeemer::new(
            api.clone(),
            Arc::new(FakeSolver::default()),
            &fast_redemption_config(),
            &CaptchaConfig::default(),
        ));
        let sink = Arc::new(RecordingSink::default());
        let worker = Worker {
            db: db.clone(),
            redeemer,
            sink: sink.clone(),
            member_delay: Duration::ZERO,
            wake: Arc::new(Notify::new()),
            current: Arc::new(RwLock::new(None)),
        };
        Ok(Fixture {
            db,
            api,
            sink,
            worker,
            alliance_id: target.id,
        })
    }

    async fn queued_job(db: &DatabaseConnection, alliance_id: i64) -> Result<redemption_job::Model> {
        queue::enqueue(db, "FROST2025", &[alliance_id], None).await?;
        Ok(queue::next_job(db).await?.unwrap())
    }

    #[tokio::test]
    async fn test_job_redeems_every_member() -> Result<()> {
        let f = fixture(&["SUCCESS", "RECEIVED.", "SUCCESS"]).await?;
        let job = queued_job(&f.db, f.alliance_id).await?;

        let summary = f.worker.process(job).await?.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.outcomes.get("success"), Some(&2));
        assert_eq!(summary.outcomes.get("already_claimed"), Some(&1));
        assert!(summary.stopped_by.is_none());

        let code = giftcode::get_gift_code(&f.db, "FROST2025").await?.unwrap();
        assert_eq!(code.status, CodeStatus::Valid);
        assert_eq!(giftcode::redeemed_fids(&f.db, "FROST2025").await?.len(), 3);

        let posted = f.sink.posted.lock().unwrap().clone();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "42");
        assert!(posted[0].1.description.contains("Redeemed: **2**"));
        Ok(())
    }

    #[tokio::test]
    async fn test_already_redeemed_members_are_skipped() -> Result<()> {
        let f = fixture(&["SUCCESS"]).await?;
        giftcode::record_outcome(&f.db, "111111111", "FROST2025", "success").await?;
        giftcode::record_outcome(&f.db, "222222222", "FROST2025", "same_type").await?;
        let job = queued_job(&f.db, f.alliance_id).await?;

        let summary = f.worker.process(job).await?.unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(f.api.submitted.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dead_code_stops_the_job() -> Result<()> {
        let f = fixture(&["TIME ERROR."]).await?;
        let job = queued_job(&f.db, f.alliance_id).await?;

        let summary = f.worker.process(job).await?.unwrap();
        assert_eq!(summary.outcomes.get("expired"), Some(&1));
        assert_eq!(summary.stopped_by.as_deref(), Some("code expired"));
        assert_eq!(f.api.submitted.lock().unwrap().len(), 1);
        let announcement = summary.to_announcement();
        assert!(
            announcement
                .description
                .ends_with("\n\n⛔ Stopped early: code expired")
        );

        let code = giftcode::get_gift_code(&f.db, "FROST2025").await?.unwrap();
        assert_eq!(code.status, CodeStatus::Expired);

        // A later job for the same code is skipped outright.
        let again = queued_job(&f.db, f.alliance_id).await?;
        assert!(f.worker.process(again).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_players_are_logged_as_errors() -> Result<()> {
        let mut f = fixture(&[]).await?;
        let api = Arc::new(FakeApi {
            missing: vec!["222222222".to_string()],
            ..FakeApi::default()
        });
        f.worker.redeemer = Arc::new(Redeemer::new(
            api,
            Arc::new(FakeSolver::default()),
            &fast_redemption_config(),
            &CaptchaConfig::default(),
        ));
        let job = queued_job(&f.db, f.alliance_id).await?;

        let summary = f.worker.process(job).await?.unwrap();
        assert_eq!(summary.outcomes.get("success"), Some(&2));
        assert_eq!(summary.outcomes.get(ERROR_OUTCOME), Some(&1));
        assert!(summary.to_announcement().description.contains("Failed: **1**"));
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_drains_queue() -> Result<()> {
        let f = fixture(&[]).await?;
        let (queue, handle) = RedemptionQueue::start(
            f.db.clone(),
            Arc::clone(&f.worker.redeemer),
            f.sink.clone(),
            Duration::ZERO,
        );

        let positions = queue.enqueue("FROST2025", &[f.alliance_id], Some("7".to_string())).await?;
        assert_eq!(positions, vec![1]);

        let drained = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if queue.status().await?.queue.queue_length == 0 && f.sink.titles().len() == 1 {
                    return Ok::<_, crate::errors::Error>(());
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        handle.abort();
        assert!(matches!(drained, Ok(Ok(()))));

        let status = queue.status().await?;
        assert!(!status.processing);
        assert!(state::get_state_value(&f.db, state::REDEMPTION_LAST_JOB).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_auto_redeem_targets_opted_in_alliances() -> Result<()> {
        let f = fixture(&[]).await?;
        let other = create_test_alliance(&f.db, "FIRE").await?;
        alliance::update_alliance(
            &f.db,
            other.id,
            AllianceUpdate {
                auto_redeem: Some(true),
                ..AllianceUpdate::default()
            },
        )
        .await?;
        let queue = RedemptionQueue {
            db: f.db.clone(),
            wake: Arc::new(Notify::new()),
            current: Arc::new(RwLock::new(None)),
        };

        let positions = queue.enqueue_auto_redeem("FROST2025").await?;
        assert_eq!(positions, vec![1]);
        let jobs = queue::pending_jobs(&f.db).await?;
        assert_eq!(jobs[0].alliance_id, other.id);
        Ok(())
    }
}
