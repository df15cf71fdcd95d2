//! State timeline - which features unlock on which server day.

use chrono::NaiveDate;

/// A feature unlock on a given server day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    /// Server day of the unlock
    pub day: u32,
    /// Short title
    pub event: &'static str,
    /// What unlocks
    pub description: &'static str,
}

const fn milestone(day: u32, event: &'static str, description: &'static str) -> Milestone {
    Milestone {
        day,
        event,
        description,
    }
}

/// Known milestones, ordered by day.
pub const TIMELINE: &[Milestone] = &[
    milestone(0, "Initial Heroes", "Game start with initial heroes"),
    milestone(14, "Tundra", "Opened Tundra territory for Alliances"),
    milestone(34, "Arena opponent Update", "Opponent pool enlarged by nearby servers"),
    milestone(39, "Fertile Land", "Opened Fertile Land"),
    milestone(40, "Gen 2 Heroes", "Alonso, Flint, Philly released"),
    milestone(53, "Sunfire Castle", "Sunfire Castle becomes the battleground for state alliances"),
    milestone(54, "First Pets Update", "Musk Ox, Arctic Wolf, Cave Hyena unlocked"),
    milestone(60, "Fire Crystal Age", "Fire Crystal 1-3 unlocked"),
    milestone(80, "SVS and KOI", "State of Power (SVS) and King of Icefield events begin"),
    milestone(90, "Second Pets Update", "Titan Roc, Giant Tapir unlocked"),
    milestone(120, "Gen 3 Heroes", "Greg, Logan, Mia released"),
    milestone(140, "Third Pets Update", "Giant Elk, Snow Leopard unlocked"),
    milestone(150, "Crystal Infrastructure", "Fire Crystal 4-5 and Crystal laboratory unlock"),
    milestone(180, "Legendary Equipment", "Chief Legendary Gear Unlock"),
    milestone(195, "Gen 4 Heroes", "Ahmose, Lynn, Reina released"),
    milestone(200, "Fourth Pets Update", "Snow Ape, Cave Lion unlocked"),
    milestone(220, "War Academy Update", "War Academy, Fire Crystal Tech and T11 Troops"),
    milestone(270, "Gen 5 Heroes", "Gwen, Hector, Norah released"),
    milestone(280, "Fifth Pets Update", "Iron Rhino, Saber-tooth Tiger unlocked"),
    milestone(315, "Advanced Crystal Update", "Fire Crystal 6-8 and Refined Fire Crystal"),
    milestone(360, "Gen 6 Heroes", "Renee, Wayne, Wuming released"),
    milestone(370, "Mammoth Update", "Mammoth pet unlocked"),
    milestone(440, "Gen 7 Heroes", "Bradley, Edith, Gordon released"),
    milestone(500, "Crystal Mastery", "Fire Crystal 9-10 unlock"),
    milestone(520, "Gen 8 Heroes", "Gatot, Hendrik, Sonya released"),
    milestone(600, "Gen 9 Heroes", "Fred, Magnus, Xura released"),
    milestone(700, "Gen 10 Heroes", "Blanchette, Freya, Gregory released"),
    milestone(800, "Gen 11 Heroes", "Eleonora Gold, Lloyd, Rufus released"),
    milestone(870, "Gen 12 Heroes", "Ligeia, Karol, Hervor released"),
    milestone(951, "Gen 13 Heroes", "Gisela, Flora, Vulcanus released"),
];

/// Date formats accepted by `/serverage date:`.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];

/// The first milestone after `day` and the number of days until it.
#[must_use]
pub fn next_milestone(day: u32) -> Option<(&'static Milestone, u32)> {
    TIMELINE
        .iter()
        .find(|m| m.day > day)
        .map(|m| (m, m.day - day))
}

/// Up to `count` milestones already reached, oldest first.
#[must_use]
pub fn recent_milestones(day: u32, count: usize) -> &'static [Milestone] {
    let reached = TIMELINE.partition_point(|m| m.day <= day);
    &TIMELINE[reached.saturating_sub(count)..reached]
}

/// Days between a server's start date and `today`, never negative.
///
/// Returns `None` when the date matches none of the accepted formats.
#[must_use]
pub fn server_age_from_date(input: &str, today: NaiveDate) -> Option<u32> {
    let input = input.trim();
    let start = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())?;
    let days = (today - start).num_days().max(0);
    Some(u32::try_from(days).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_timeline_is_sorted() {
        assert!(TIMELINE.windows(2).all(|w| w[0].day < w[1].day));
        assert_eq!(TIMELINE.len(), 30);
    }

    #[test]
    fn test_next_milestone() {
        let (next, days) = next_milestone(0).unwrap();
        assert_eq!(next.event, "Tundra");
        assert_eq!(days, 14);

        let (next, days) = next_milestone(53).unwrap();
        assert_eq!(next.day, 54);
        assert_eq!(days, 1);

        assert!(next_milestone(951).is_none());
        assert!(next_milestone(2000).is_none());
    }

    #[test]
    fn test_recent_milestones() {
        let recent = recent_milestones(60, 3);
        let days: Vec<u32> = recent.iter().map(|m| m.day).collect();
        assert_eq!(days, vec![53, 54, 60]);

        assert_eq!(recent_milestones(0, 3).len(), 1);
        assert_eq!(recent_milestones(10_000, 3).last().unwrap().day, 951);
    }

    #[test]
    fn test_server_age_from_date_formats() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(server_age_from_date("2025-03-01", today), Some(10));
        assert_eq!(server_age_from_date("01/03/2025", today), Some(10));
        assert_eq!(server_age_from_date("01.03.2025", today), Some(10));
        // Not a valid day/month order, so the month-first format applies
        assert_eq!(server_age_from_date("02/25/2025", today), Some(14));
        assert_eq!(server_age_from_date("2026-01-01", today), Some(0));
        assert_eq!(server_age_from_date("yesterday", today), None);
    }
}
