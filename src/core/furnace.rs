//! Furnace level formatting.
//!
//! The game reports furnace levels as a single integer. Levels above 30 are
//! shown in game as the "30-x" steps and then fire crystal (FC) tiers with
//! four sub-steps each.

/// In-game label for a raw furnace level (e.g. `36` -> `"FC 1-1"`).
#[must_use]
pub fn furnace_label(level: i32) -> String {
    match level {
        31..=34 => format!("30-{}", level - 30),
        35.. => {
            let tier = (level - 35) / 5 + 1;
            let step = (level - 35) % 5;
            if step == 0 {
                format!("FC {tier}")
            } else {
                format!("FC {tier}-{step}")
            }
        }
        _ => level.to_string(),
    }
}

/// Coarse fire crystal tier used on player cards (`31..=39` is FC1, then every 5 levels).
#[must_use]
pub fn fc_tier(level: i32) -> Option<String> {
    match level {
        31..=39 => Some("FC1".to_string()),
        40.. => Some(format!("FC{}", (level - 40) / 5 + 2)),
        _ => None,
    }
}

/// Short value for player cards: the FC tier when there is one, otherwise the level.
#[must_use]
pub fn furnace_display(level: i32) -> String {
    fc_tier(level).unwrap_or_else(|| level.to_string())
}

/// Emoji prefix for a furnace level.
#[must_use]
pub const fn furnace_emoji(level: i32) -> &'static str {
    match level {
        ..=30 => "🔥",
        31..=34 => "🔶",
        _ => "💎",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_furnace_label() {
        assert_eq!(furnace_label(25), "25");
        assert_eq!(furnace_label(30), "30");
        assert_eq!(furnace_label(31), "30-1");
        assert_eq!(furnace_label(34), "30-4");
        assert_eq!(furnace_label(35), "FC 1");
        assert_eq!(furnace_label(36), "FC 1-1");
        assert_eq!(furnace_label(39), "FC 1-4");
        assert_eq!(furnace_label(40), "FC 2");
        assert_eq!(furnace_label(84), "FC 10-4");
    }

    #[test]
    fn test_fc_tier() {
        assert_eq!(fc_tier(30), None);
        assert_eq!(fc_tier(31).as_deref(), Some("FC1"));
        assert_eq!(fc_tier(39).as_deref(), Some("FC1"));
        assert_eq!(fc_tier(40).as_deref(), Some("FC2"));
        assert_eq!(fc_tier(44).as_deref(), Some("FC2"));
        assert_eq!(fc_tier(45).as_deref(), Some("FC3"));
        assert_eq!(fc_tier(59).as_deref(), Some("FC5"));
    }

    #[test]
    fn test_furnace_display_and_emoji() {
        assert_eq!(furnace_display(22), "22");
        assert_eq!(furnace_display(50), "FC4");
        assert_eq!(furnace_emoji(10), "🔥");
        assert_eq!(furnace_emoji(33), "🔶");
        assert_eq!(furnace_emoji(60), "💎");
    }
}
