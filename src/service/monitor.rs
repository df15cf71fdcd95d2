//! Alliance change feed.
//!
//! Every tick the monitor looks at the enabled monitoring rows, rescans the
//! alliances whose own interval has elapsed, and posts one embed per detected
//! change (rename, furnace level, avatar) to the configured channel.

use crate::{
    config::app::MonitorConfig,
    core::{
        alliance, furnace, member,
        monitor::{self, MemberChange},
        state,
    },
    entities::monitoring,
    errors::Result,
    service::{Announcement, ChannelSink},
    wos::{GiftApi, PlayerInfo},
};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Scans monitored alliances in the background.
pub struct AllianceMonitor {
    db: DatabaseConnection,
    api: Arc<dyn GiftApi>,
    sink: Arc<dyn ChannelSink>,
    tick: Duration,
    member_delay: Duration,
    alliance_delay: Duration,
}

impl AllianceMonitor {
    /// Creates a monitor from the `[monitor]` section.
    pub fn new(
        db: DatabaseConnection,
        api: Arc<dyn GiftApi>,
        sink: Arc<dyn ChannelSink>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            db,
            api,
            sink,
            tick: Duration::from_secs(config.interval_secs.max(1)),
            member_delay: Duration::from_millis(config.member_delay_ms),
            alliance_delay: Duration::from_secs(config.alliance_delay_secs),
        }
    }

    /// Spawns the monitor loop.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.tick);
        info!("Alliance monitor running every {:?}", self.tick);
        loop {
            ticker.tick().await;
            match self.sweep(chrono::Utc::now().naive_utc()).await {
                Ok(0) => {}
                Ok(posted) => info!("Monitor sweep posted {posted} change(s)"),
                Err(e) => error!("Monitor sweep failed: {e}"),
            }
        }
    }

    /// Scans every due alliance. Returns the number of changes posted.
    pub async fn sweep(&self, now: NaiveDateTime) -> Result<usize> {
        let rows = monitor::list_enabled(&self.db).await?;
        let due: Vec<monitoring::Model> = rows
            .into_iter()
            .filter(|row| monitor::is_due(row, now))
            .collect();

        let mut posted = 0;
        for (index, row) in due.iter().enumerate() {
            if index > 0 && !self.alliance_delay.is_zero() {
                tokio::time::sleep(self.alliance_delay).await;
            }
            match self.scan(row).await {
                Ok(count) => posted += count,
                Err(e) => warn!("Monitor {} failed: {e}", row.id),
            }
            monitor::mark_checked(&self.db, row.id).await?;
        }

        state::touch(&self.db, state::MONITOR_LAST_SWEEP).await?;
        Ok(posted)
    }

    /// Refreshes every member of the row's alliance and posts their changes.
    #[instrument(skip(self, row), fields(alliance_id = row.alliance_id))]
    async fn scan(&self, row: &monitoring::Model) -> Result<usize> {
        let Some(target) = alliance::get_alliance_by_id(&self.db, row.alliance_id).await? else {
            debug!("Alliance {} no longer exists", row.alliance_id);
            return Ok(0);
        };
        let members = member::list_members(&self.db, target.id).await?;
        let history = monitor::history_for_alliance(&self.db, target.id).await?;

        let mut posted = 0;
        for (index, player) in members.iter().enumerate() {
            if index > 0 && !self.member_delay.is_zero() {
                tokio::time::sleep(self.member_delay).await;
            }

            let fresh = match self.api.player(&player.fid).await {
                Ok(data) => PlayerInfo::from(data).to_snapshot(),
                Err(e) => {
                    warn!("Skipping {}: {e}", player.fid);
                    continue;
                }
            };

            let changes = monitor::detect_changes(history.get(&player.fid), &fresh);
            member::refresh_member(&self.db, &fresh).await?;
            monitor::record_snapshot(&self.db, target.id, &fresh).await?;

            for change in changes {
                let announcement = change_announcement(&change, &target.name, fresh.avatar_url.clone());
                match self.sink.post(&row.channel_id, announcement).await {
                    Ok(()) => posted += 1,
                    Err(e) => warn!("Failed to post {} for {}: {e}", change.kind(), change.fid()),
                }
            }
        }
        Ok(posted)
    }
}

/// Embed describing one change.
#[must_use]
pub fn change_announcement(
    change: &MemberChange,
    alliance_name: &str,
    avatar_url: Option<String>,
) -> Announcement {
    let (description, color, thumbnail) = match change {
        MemberChange::NameChange { old, new, .. } => {
            (format!("**{old}** is now known as **{new}**"), 0x0034_98DB, avatar_url)
        }
        MemberChange::FurnaceChange {
            nickname,
            old,
            new,
            upgrade,
            ..
        } => {
            let arrow = if *upgrade { "⬆️" } else { "⬇️" };
            (
                format!(
                    "**{nickname}** {arrow} {} → {} {}",
                    furnace::furnace_label(*old),
                    furnace::furnace_label(*new),
                    furnace::furnace_emoji(*new)
                ),
                if *upgrade { 0x002E_CC71 } else { 0x00E6_7E22 },
                avatar_url,
            )
        }
        MemberChange::AvatarChange { nickname, new, .. } => (
            format!("**{nickname}** changed their avatar"),
            0x009B_59B6,
            Some(new.clone()),
        ),
    };

    Announcement {
        title: change.kind().to_string(),
        description,
        color,
        fields: vec![
            ("Alliance".to_string(), alliance_name.to_string(), true),
            ("Player ID".to_string(), change.fid().to_string(), true),
        ],
        thumbnail,
        footer: None,
    }
}
