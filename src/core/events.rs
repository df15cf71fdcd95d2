//! Event guide - short reference cards for recurring in-game events.

/// Reference card for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventGuide {
    /// Lookup key (lowercase, no spaces)
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// Event category (e.g. "Alliance", "PvP")
    pub category: &'static str,
    /// "Easy", "Medium", "Hard" or "Expert"
    pub difficulty: &'static str,
    /// How long the event runs
    pub duration: &'static str,
    /// Main rewards
    pub rewards: &'static str,
    /// Practical advice
    pub tips: &'static str,
}

/// Every event with a guide.
pub const EVENTS: &[EventGuide] = &[
    EventGuide {
        key: "bear",
        name: "Bear Hunt",
        category: "Alliance",
        difficulty: "Medium",
        duration: "30 minutes, every 2 days",
        rewards: "Hero shards, speedups, Chief gear materials",
        tips: "Send your strongest marches with ranged-heavy formations and rally as often as possible. Fill every rally slot before it launches.",
    },
    EventGuide {
        key: "foundry",
        name: "Foundry Battle",
        category: "PvP",
        difficulty: "Hard",
        duration: "1 hour, every 2 weeks",
        rewards: "Arsenal tokens, Charm materials, alliance honor",
        tips: "Register early, assign buildings before the start and keep healers ready. Hold the Imperial Foundry late in the match for the biggest score.",
    },
    EventGuide {
        key: "crazyjoe",
        name: "Crazy Joe",
        category: "Alliance",
        difficulty: "Medium",
        duration: "About 1 hour, twice a week",
        rewards: "Speedups, resources, alliance points",
        tips: "Stay online and keep infantry in the city. Reinforce members who are offline; waves 10 and 20 hit the headquarters.",
    },
    EventGuide {
        key: "alliancemobilization",
        name: "Alliance Mobilization",
        category: "Alliance",
        difficulty: "Easy",
        duration: "5 days",
        rewards: "Mythic shards, speedups, alliance points",
        tips: "Pick tasks that match your current upgrades and refresh low-value ones. Finish every claimed task before it expires.",
    },
    EventGuide {
        key: "alliancechampionship",
        name: "Alliance Championship",
        category: "PvP",
        difficulty: "Expert",
        duration: "1 week",
        rewards: "Championship badges, gems, exclusive decorations",
        tips: "Balance the three lanes with your best lineups and check opponent power before finalizing. Troop losses are not permanent, so commit fully.",
    },
    EventGuide {
        key: "canyonclash",
        name: "Canyon Clash",
        category: "PvP",
        difficulty: "Hard",
        duration: "1 hour, monthly",
        rewards: "Canyon coins, hero shards, gems",
        tips: "Coordinate on voice, capture the fortresses quickly and use fuel wisely. Defend the Frost Dragon spawn together.",
    },
    EventGuide {
        key: "fishingtournament",
        name: "Fishing Tournament",
        category: "Casual",
        difficulty: "Easy",
        duration: "3 days",
        rewards: "Fishing points, resources, decorations",
        tips: "Use all daily bait and save premium bait for the final day. Rank rewards are decided by total weight.",
    },
    EventGuide {
        key: "frostfiremine",
        name: "Frostfire Mine",
        category: "Resource",
        difficulty: "Medium",
        duration: "30 minutes, weekly",
        rewards: "Frostfire crystals, fire crystal shards",
        tips: "Claim veins close to your spawn first and switch to larger veins once the boosts appear. Protect miners from raids.",
    },
];

/// Finds a guide by key or name, ignoring case, spaces, dashes and underscores.
#[must_use]
pub fn find_event(query: &str) -> Option<&'static EventGuide> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return None;
    }
    EVENTS
        .iter()
        .find(|event| event.key == normalized || normalize(event.name) == normalized)
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Comma-separated keys for error messages.
#[must_use]
pub fn available_keys() -> String {
    EVENTS
        .iter()
        .map(|event| event.key)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Embed colour for a difficulty.
#[must_use]
pub fn difficulty_color(difficulty: &str) -> u32 {
    match difficulty.to_lowercase().as_str() {
        "easy" => 0x002E_CC71,
        "medium" => 0x00F1_C40F,
        "hard" => 0x00E6_7E22,
        "expert" => 0x00E7_4C3C,
        _ => 0x0034_98DB,
    }
}

/// Emoji shown before an event name.
#[must_use]
pub fn category_emoji(category: &str) -> &'static str {
    match category.to_lowercase().as_str() {
        "alliance" => "🤝",
        "pvp" => "⚔️",
        "casual" => "🎣",
        "resource" => "⛏️",
        _ => "📅",
    }
}
