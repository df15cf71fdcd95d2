//! Reply formatting that respects Discord's size limits.

pub use crate::music::EMBED_DESCRIPTION_LIMIT;

/// Plain message content is limited to this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Longest single error shown in a bulk report.
const FAILURE_LINE_LIMIT: usize = 200;

/// Room kept free for the "... and N more" line.
const MORE_RESERVE: usize = 24;

/// Joins `lines` with newlines, stopping before `limit` characters.
///
/// Lines that do not fit are summarised as `... and N more`, so the result
/// never exceeds `limit`.
#[must_use]
pub fn fit_lines<S: AsRef<str>>(lines: &[S], limit: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let cost = line.chars().count() + 1;
        let remaining = lines.len() - index;
        let reserve = if remaining > 1 { MORE_RESERVE } else { 0 };

        if used + cost + reserve > limit {
            let more = format!("... and {remaining} more\n");
            if used + more.chars().count() <= limit {
                out.push_str(&more);
            }
            break;
        }
        out.push_str(line);
        out.push('\n');
        used += cost;
    }
    out
}

fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut short: String = text.chars().take(limit.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

/// Reply for `/alliance addmember`: who was added and which ids failed.
///
/// When both lists are present each gets half of [`MESSAGE_LIMIT`], so the
/// failures stay visible however many players were added.
#[must_use]
pub fn member_report(alliance: &str, added: &[String], failed: &[String]) -> String {
    let mut response = String::new();
    let failed_budget = if failed.is_empty() { 0 } else { MESSAGE_LIMIT / 2 };

    if !added.is_empty() {
        let header = format!("✅ Added {} member(s) to **{alliance}**:\n", added.len());
        let bullets: Vec<String> = added.iter().map(|line| format!("• {line}")).collect();
        let budget = MESSAGE_LIMIT - failed_budget - header.chars().count();
        response.push_str(&header);
        response.push_str(&fit_lines(&bullets, budget));
    }
    if !failed.is_empty() {
        let header = format!("❌ Could not add {} id(s):\n", failed.len());
        let bullets: Vec<String> = failed
            .iter()
            .map(|line| format!("• {}", shorten(line, FAILURE_LINE_LIMIT)))
            .collect();
        let budget =
            MESSAGE_LIMIT.saturating_sub(response.chars().count() + header.chars().count());
        response.push_str(&header);
        response.push_str(&fit_lines(&bullets, budget));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_lines_keeps_everything_that_fits() {
        let lines = ["one", "two", "three"];
        assert_eq!(fit_lines(&lines, 100), "one\ntwo\nthree\n");
        assert_eq!(fit_lines::<&str>(&[], 100), "");
    }

    #[test]
    fn test_fit_lines_summarises_overflow() {
        let lines: Vec<String> = (0..40)
            .map(|i| format!("**Alliance {i:02}** (id {i}) · 👥 50 member(s)"))
            .collect();

        let text = fit_lines(&lines, 300);
        assert!(text.chars().count() <= 300);
        assert!(text.starts_with("**Alliance 00**"));
        let last = text.lines().last().unwrap_or_default();
        assert!(last.starts_with("... and "), "{last}");
        assert!(last.ends_with(" more"));

        let shown = text.lines().count() - 1;
        assert_eq!(last, format!("... and {} more", 40 - shown));
    }

    #[test]
    fn test_member_report_stays_within_message_limit() {
        let added: Vec<String> = (0..30)
            .map(|i| format!("Player{i} (1000000{i:02}, FC 5)"))
            .collect();
        let failed: Vec<String> = (0..30)
            .map(|i| format!("`2000000{i:02}`: Upstream returned HTTP 502: {}", "x".repeat(300)))
            .collect();

        let report = member_report("ICE", &added, &failed);
        assert!(report.chars().count() <= MESSAGE_LIMIT);
        assert!(report.contains("✅ Added 30 member(s) to **ICE**"));
        assert!(report.contains("❌ Could not add 30 id(s)"));
        assert!(report.contains("... and "));
        assert!(report.lines().all(|line| line.chars().count() <= FAILURE_LINE_LIMIT + 2));
    }

    #[test]
    fn test_member_report_short_lists_are_complete() {
        let report = member_report(
            "ICE",
            &["Anna (111111111, FC 5)".to_string()],
            &["`222222222`: Player 222222222 not found".to_string()],
        );
        assert_eq!(
            report,
            "✅ Added 1 member(s) to **ICE**:\n• Anna (111111111, FC 5)\n\
             ❌ Could not add 1 id(s):\n• `222222222`: Player 222222222 not found\n"
        );
    }
}
