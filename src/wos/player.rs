//! Player profile lookups with a short-lived cache.

use crate::{
    config::app::PlayerConfig,
    core::{furnace, member::PlayerSnapshot},
    errors::{Error, Result},
    wos::client::{GiftApi, PlayerData},
};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Length of every player id.
pub const FID_LEN: usize = 9;

/// A player's public profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    /// 9-digit player id
    pub fid: String,
    /// In-game nickname
    pub nickname: String,
    /// State number
    pub kid: i32,
    /// Raw furnace level
    pub furnace_level: i32,
    /// Furnace icon URL (fire crystal levels only)
    pub stove_icon: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

impl From<PlayerData> for PlayerInfo {
    fn from(data: PlayerData) -> Self {
        let stove_icon = data.stove_icon();
        Self {
            fid: data.fid.to_string(),
            nickname: data.nickname,
            kid: data.kid,
            furnace_level: data.stove_lv,
            stove_icon,
            avatar_url: Some(data.avatar_image).filter(|url| !url.is_empty()),
        }
    }
}

impl PlayerInfo {
    /// Furnace level as players write it (`30-2`, `FC 3-1`, ...).
    #[must_use]
    pub fn furnace_label(&self) -> String {
        furnace::furnace_label(self.furnace_level)
    }

    /// Roster data for this player.
    #[must_use]
    pub fn to_snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            fid: self.fid.clone(),
            nickname: self.nickname.clone(),
            furnace_level: self.furnace_level,
            kid: self.kid,
            stove_icon: self.stove_icon.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Whether `fid` looks like a player id.
#[must_use]
pub fn is_valid_fid(fid: &str) -> bool {
    fid.len() == FID_LEN && fid.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a list of player ids separated by commas, whitespace or both.
///
/// Duplicates are dropped, order is kept.
///
/// # Errors
/// Fails when the list is empty, longer than `max_batch`, or contains
/// anything other than 9-digit ids (all offenders are named).
pub fn validate_ids(raw: &str, max_batch: usize) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(ToString::to_string)
        .collect();

    if ids.is_empty() {
        return Err(Error::validation("Please provide at least one player ID"));
    }
    if ids.len() > max_batch {
        return Err(Error::validation(format!(
            "Too many player IDs ({}), the limit is {max_batch}",
            ids.len()
        )));
    }

    let invalid: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| !is_valid_fid(id))
        .collect();
    if !invalid.is_empty() {
        return Err(Error::InvalidPlayerId {
            id: invalid.join(", "),
        });
    }
    Ok(ids)
}

/// Cached access to `/api/player`.
pub struct PlayerLookup {
    api: Arc<dyn GiftApi>,
    ttl: Duration,
    concurrency: usize,
    max_batch: usize,
    cache: Mutex<HashMap<String, (Instant, PlayerInfo)>>,
}

impl PlayerLookup {
    /// Creates a lookup from the `[player]` section.
    pub fn new(api: Arc<dyn GiftApi>, config: &PlayerConfig) -> Self {
        Self {
            api,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            concurrency: config.concurrency.max(1),
            max_batch: config.max_batch,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Maximum ids accepted by [`validate_ids`] for this lookup.
    #[must_use]
    pub const fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Fetches one player, served from the cache while fresh.
    pub async fn fetch(&self, fid: &str) -> Result<PlayerInfo> {
        if let Some((fetched_at, info)) = self.cache.lock().await.get(fid)
            && fetched_at.elapsed() < self.ttl
        {
            debug!("Player {fid} served from cache");
            return Ok(info.clone());
        }

        let info = PlayerInfo::from(self.api.player(fid).await?);
        self.cache
            .lock()
            .await
            .insert(fid.to_string(), (Instant::now(), info.clone()));
        Ok(info)
    }

    /// Fetches several players, at most `concurrency` at a time.
    ///
    /// Results come back in input order, each with its own outcome.
    pub async fn fetch_many(&self, ids: &[String]) -> Vec<(String, Result<PlayerInfo>)> {
        stream::iter(ids.iter().cloned())
            .map(|fid| async move {
                let outcome = self.fetch(&fid).await;
                (fid, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Drops expired cache entries.
    pub async fn prune(&self) {
        let ttl = self.ttl;
        self.cache
            .lock()
            .await
            .retain(|_, (fetched_at, _)| fetched_at.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use crate::wos::redeem::tests::FakeApi;
    use std::sync::atomic::Ordering;

    fn lookup(api: Arc<FakeApi>, ttl_secs: u64) -> PlayerLookup {
        PlayerLookup::new(
            api,
            &PlayerConfig {
                cache_ttl_secs: ttl_secs,
                max_batch: 30,
                concurrency: 2,
            },
        )
    }

    #[test]
    fn test_validate_ids() {
        let ids = validate_ids(" 123456789, 987654321 ,,123456789", 30).unwrap();
        assert_eq!(ids, vec!["123456789", "987654321"]);

        let err = validate_ids("123456789,12345,abcdefghi", 30).unwrap_err();
        assert!(matches!(err, Error::InvalidPlayerId { ref id } if id == "12345, abcdefghi"));

        assert!(matches!(validate_ids(" , ", 30), Err(Error::Validation { .. })));
        assert!(matches!(
            validate_ids("123456789,223456789,323456789", 2),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_ids_accepts_spaces_and_mixed_separators() {
        let ids = validate_ids("123456789 987654321", 30).unwrap();
        assert_eq!(ids, vec!["123456789", "987654321"]);

        let ids = validate_ids("123456789, 987654321\n555555555\t123456789 ,", 30).unwrap();
        assert_eq!(ids, vec!["123456789", "987654321", "555555555"]);

        let err = validate_ids("123456789 1234", 30).unwrap_err();
        assert!(matches!(err, Error::InvalidPlayerId { ref id } if id == "1234"));
    }

    #[test]
    fn test_player_info_from_api_data() {
        let info = PlayerInfo::from(PlayerData {
            fid: 123_456_789,
            nickname: "Anna".to_string(),
            kid: 77,
            stove_lv: 37,
            stove_lv_content: serde_json::Value::from("https://cdn.example/fc.png"),
            avatar_image: String::new(),
        });
        assert_eq!(info.fid, "123456789");
        assert_eq!(info.furnace_label(), "FC 1-2");
        assert!(info.avatar_url.is_none());
        assert_eq!(info.stove_icon.as_deref(), Some("https://cdn.example/fc.png"));

        let snapshot = info.to_snapshot();
        assert_eq!(snapshot.kid, 77);
        assert_eq!(snapshot.furnace_level, 37);
    }

    #[tokio::test]
    async fn test_fetch_uses_cache() -> Result<()> {
        init_test_tracing();
        let api = Arc::new(FakeApi::default());
        let lookup = lookup(api.clone(), 60);

        let first = lookup.fetch("123456789").await?;
        let second = lookup.fetch("123456789").await?;
        assert_eq!(first, second);
        assert_eq!(api.logins.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() -> Result<()> {
        let api = Arc::new(FakeApi::default());
        let lookup = lookup(api.clone(), 0);

        lookup.fetch("123456789").await?;
        lookup.fetch("123456789").await?;
        assert_eq!(api.logins.load(Ordering::Relaxed), 2);

        lookup.prune().await;
        assert!(lookup.cache.lock().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_many_keeps_order_and_errors() {
        let api = Arc::new(FakeApi {
            missing: vec!["222222222".to_string()],
            ..FakeApi::default()
        });
        let lookup = lookup(api, 60);
        let ids: Vec<String> = ["111111111", "222222222", "333333333"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let results = lookup.fetch_many(&ids).await;
        let order: Vec<&str> = results.iter().map(|(fid, _)| fid.as_str()).collect();
        assert_eq!(order, vec!["111111111", "222222222", "333333333"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::PlayerNotFound { .. })));
        assert_eq!(results[2].1.as_ref().unwrap().nickname, "player-333333333");
    }
}
