//! Voice queue helpers shared by the music commands.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::time::Duration;
use tokio::sync::Mutex;

/// Embed descriptions are limited to this many characters.
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Default width of [`progress_bar`].
pub const PROGRESS_WIDTH: usize = 20;

/// What we know about a queued track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    /// Title reported by the source
    pub title: Option<String>,
    /// Length, when known
    pub duration: Option<Duration>,
    /// Uploader
    pub channel: Option<String>,
    /// Page of the track
    pub url: Option<String>,
    /// Thumbnail image
    pub thumbnail: Option<String>,
}

impl From<songbird::input::AuxMetadata> for TrackInfo {
    fn from(meta: songbird::input::AuxMetadata) -> Self {
        Self {
            title: meta.title,
            duration: meta.duration,
            channel: meta.channel,
            url: meta.source_url,
            thumbnail: meta.thumbnail,
        }
    }
}

impl Display for TrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("<unknown title>");
        let duration = self.duration.map(format_duration).unwrap_or_default();
        let channel = self.channel.as_deref().unwrap_or_default();
        match &self.url {
            Some(url) => write!(f, "[{title}]({url}) `{duration}` {channel}"),
            None => write!(f, "{title} `{duration}` {channel}"),
        }
    }
}

/// `m:ss`, or `h:mm:ss` past an hour.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Text progress bar such as `▬▬▬🔘▬▬▬▬▬▬`.
///
/// An unknown or zero total puts the knob at the start.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn progress_bar(position: Duration, total: Option<Duration>, width: usize) -> String {
    let width = width.max(1);
    let filled = match total {
        Some(total) if !total.is_zero() => {
            let ratio = position.as_secs_f64() / total.as_secs_f64();
            (ratio.clamp(0.0, 1.0) * (width - 1) as f64).round() as usize
        }
        _ => 0,
    };

    let mut bar = String::with_capacity(width * 3);
    for slot in 0..width {
        bar.push_str(if slot == filled { "🔘" } else { "▬" });
    }
    bar
}

/// Numbered queue listing that fits in one embed description.
#[must_use]
pub fn queue_display(tracks: &[TrackInfo]) -> String {
    if tracks.is_empty() {
        return "The queue is empty.".to_string();
    }

    let mut buffer = String::new();
    for (index, track) in tracks.iter().enumerate() {
        let label = if index == 0 { "▶️".to_string() } else { format!("`{index}.`") };
        let line = format!("{label} {track}");
        if buffer.chars().count() + line.chars().count() + 1 > EMBED_DESCRIPTION_LIMIT {
            break;
        }
        buffer.push_str(&line);
        buffer.push('\n');
    }
    buffer
}

/// Whether a `/play` query should be fetched directly rather than searched.
#[must_use]
pub fn is_url(query: &str) -> bool {
    let query = query.trim();
    query.starts_with("https://") || query.starts_with("http://")
}

/// Metadata of queued tracks per server, keyed by the track id songbird assigns.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    guilds: Mutex<HashMap<String, HashMap<String, TrackInfo>>>,
}

impl TrackRegistry {
    /// Remembers the metadata of a queued track.
    pub async fn insert(&self, guild_id: &str, track_id: String, info: TrackInfo) {
        self.guilds
            .lock()
            .await
            .entry(guild_id.to_string())
            .or_default()
            .insert(track_id, info);
    }

    /// Metadata of each track id, in order. Unknown ids get an empty entry.
    pub async fn lookup(&self, guild_id: &str, track_ids: &[String]) -> Vec<TrackInfo> {
        let guilds = self.guilds.lock().await;
        let tracks = guilds.get(guild_id);
        track_ids
            .iter()
            .map(|id| {
                tracks
                    .and_then(|tracks| tracks.get(id))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Forgets every track of the server that is not in `live`.
    pub async fn retain(&self, guild_id: &str, live: &[String]) {
        let mut guilds = self.guilds.lock().await;
        if let Some(tracks) = guilds.get_mut(guild_id) {
            tracks.retain(|id, _| live.contains(id));
            if tracks.is_empty() {
                guilds.remove(guild_id);
            }
        }
    }

    /// Number of tracks remembered across all servers.
    pub async fn count(&self) -> usize {
        self.guilds.lock().await.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, secs: u64) -> TrackInfo {
        TrackInfo {
            title: Some(title.to_string()),
            duration: Some(Duration::from_secs(secs)),
            ..TrackInfo::default()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "0:05");
        assert_eq!(format_duration(Duration::from_secs(185)), "3:05");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1:02:05");
    }

    #[test]
    fn test_progress_bar() {
        let total = Some(Duration::from_secs(100));
        assert!(progress_bar(Duration::ZERO, total, 5).starts_with("🔘"));
        assert!(progress_bar(Duration::from_secs(100), total, 5).ends_with("🔘"));
        assert_eq!(progress_bar(Duration::from_secs(50), total, 5), "▬▬🔘▬▬");
        assert_eq!(progress_bar(Duration::from_secs(500), total, 5), "▬▬▬▬🔘");
        assert_eq!(progress_bar(Duration::from_secs(30), None, 3), "🔘▬▬");
        assert_eq!(progress_bar(Duration::from_secs(30), total, PROGRESS_WIDTH).chars().count(), PROGRESS_WIDTH);
    }

    #[test]
    fn test_queue_display() {
        assert_eq!(queue_display(&[]), "The queue is empty.");

        let listing = queue_display(&[track("Frostbite", 200), track("Blizzard", 61)]);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "▶️ Frostbite `3:20` ");
        assert_eq!(lines[1], "`1.` Blizzard `1:01` ");
        assert!(listing.ends_with('\n'));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_queue_display_is_capped() {
        let long_title = "x".repeat(300);
        let tracks: Vec<TrackInfo> = (0..50).map(|_| track(&long_title, 60)).collect();
        let listing = queue_display(&tracks);
        assert!(listing.chars().count() <= EMBED_DESCRIPTION_LIMIT);
        assert!(listing.lines().count() < 50);
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://youtu.be/abc"));
        assert!(!is_url("never gonna give you up"));
    }

    #[tokio::test]
    async fn test_track_registry_follows_queue() {
        let registry = TrackRegistry::default();
        registry.insert("g1", "a".to_string(), track("Frostbite", 200)).await;
        registry.insert("g1", "b".to_string(), track("Blizzard", 61)).await;
        registry.insert("g2", "c".to_string(), track("Whiteout", 90)).await;

        let infos = registry
            .lookup("g1", &["b".to_string(), "missing".to_string()])
            .await;
        assert_eq!(infos[0].title.as_deref(), Some("Blizzard"));
        assert_eq!(infos[1], TrackInfo::default());

        registry.retain("g1", &["b".to_string()]).await;
        assert_eq!(registry.count().await, 2);

        registry.retain("g1", &[]).await;
        assert_eq!(registry.count().await, 1);
        assert!(registry.lookup("g2", &["c".to_string()]).await[0].title.is_some());
    }
}
