//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions are filtered by the user's partial input, capped at Discord's
//! limit of 25 and sorted alphabetically.

use crate::{
    bot::Context,
    core::{admin, events, giftcode},
};

/// Discord shows at most this many suggestions.
const MAX_SUGGESTIONS: usize = 25;

/// Case-insensitive substring filter shared by all handlers.
fn matching<I>(candidates: I, partial: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = candidates
        .into_iter()
        .filter(|candidate| candidate.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect();
    matching.sort();
    matching
}

/// Provides autocomplete suggestions for alliance names.
///
/// Only alliances the caller may manage are suggested. Callers who are not
/// admins get no suggestions.
pub async fn autocomplete_alliance_name(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let db = &ctx.data().database;
    let user_id = ctx.author().id.to_string();
    let guild_id = ctx.guild_id().map(|id| id.to_string());

    let Ok(Some(caller)) = admin::get_admin(db, &user_id).await else {
        return Vec::new();
    };
    let Ok(alliances) = admin::accessible_alliances(db, &caller, guild_id.as_deref()).await
    else {
        return Vec::new();
    };

    matching(alliances.into_iter().map(|a| a.name), partial)
}

/// Provides autocomplete suggestions for gift codes, newest first in storage order.
pub async fn autocomplete_gift_code(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let Ok(codes) = giftcode::list_gift_codes(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(codes.into_iter().map(|c| c.code), partial)
}

/// Provides autocomplete suggestions for event names.
#[allow(clippy::unused_async)] // poise awaits every autocomplete callback
pub async fn autocomplete_event_name(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(
        events::EVENTS.iter().map(|event| event.name.to_string()),
        partial,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_filters_sorts_and_caps() {
        let names = ["Ice Wolves", "frost", "Sunfire", "ICEBORN"].map(String::from);
        assert_eq!(matching(names, "ice"), vec!["ICEBORN", "Ice Wolves"]);

        let many = (0..40).map(|i| format!("code{i:02}"));
        let suggestions = matching(many, "");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert!(suggestions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_event_names_match_guides() {
        let names = matching(events::EVENTS.iter().map(|e| e.name.to_string()), "bear");
        assert_eq!(names, vec!["Bear Hunt"]);
        assert!(events::find_event(&names[0]).is_some());
    }
}
