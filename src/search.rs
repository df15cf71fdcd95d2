//! Web search through the DuckDuckGo instant answer API.

use crate::errors::{Error, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Instant answer endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Longest rendered reply before truncation.
pub const MAX_RENDERED_LEN: usize = 1900;

/// Appended to a truncated reply.
pub const TRUNCATION_MARKER: &str = "\n\n...[truncated]";

/// Default and maximum number of results.
pub const DEFAULT_RESULTS: u32 = 3;
const MAX_RESULTS: u32 = 5;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Page title
    pub title: String,
    /// Link
    pub url: String,
    /// Short description, may be empty
    pub snippet: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "Results")]
    results: Vec<Topic>,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Topic {
    #[serde(rename = "FirstURL")]
    first_url: String,
    #[serde(rename = "Text")]
    text: String,
    /// Present on topic groups
    #[serde(rename = "Topics")]
    topics: Vec<Topic>,
}

impl Topic {
    fn flatten_into(self, out: &mut Vec<SearchResult>) {
        if !self.first_url.is_empty() && !self.text.is_empty() {
            let (title, snippet) = match self.text.split_once(" - ") {
                Some((title, snippet)) => (title.to_string(), snippet.to_string()),
                None => (self.text.clone(), String::new()),
            };
            out.push(SearchResult {
                title,
                url: self.first_url,
                snippet,
            });
        }
        for topic in self.topics {
            topic.flatten_into(out);
        }
    }
}

/// Clamps a requested result count to `1..=5`.
#[must_use]
pub fn clamp_results(requested: Option<u32>) -> usize {
    requested.unwrap_or(DEFAULT_RESULTS).clamp(1, MAX_RESULTS) as usize
}

/// Extracts at most `max` results from an instant answer document.
pub fn parse_results(json: &str, max: usize) -> Result<Vec<SearchResult>> {
    let answer: InstantAnswer = serde_json::from_str(json)?;
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() && !answer.abstract_url.is_empty() {
        results.push(SearchResult {
            title: if answer.heading.is_empty() {
                "(no title)".to_string()
            } else {
                answer.heading
            },
            url: answer.abstract_url,
            snippet: answer.abstract_text,
        });
    }
    for topic in answer.results.into_iter().chain(answer.related_topics) {
        topic.flatten_into(&mut results);
    }

    results.truncate(max);
    Ok(results)
}

/// Formats results as Discord message blocks, capped at [`MAX_RENDERED_LEN`].
#[must_use]
pub fn render(results: &[SearchResult]) -> String {
    let content = results
        .iter()
        .map(|r| format!("**{}**\n{}\n<{}>", r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n\n");

    if content.chars().count() > MAX_RENDERED_LEN {
        let mut cut: String = content.chars().take(MAX_RENDERED_LEN).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        content
    }
}

/// HTTP client for the instant answer API.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    /// Creates a client against [`DEFAULT_ENDPOINT`].
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Searches for `query`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("Search query is empty"));
        }

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let results = parse_results(&body, max)?;
        debug!("{} result(s) for '{query}'", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const SAMPLE: &str = r#"{
        "Heading": "Whiteout Survival",
        "AbstractText": "Whiteout Survival is a survival strategy game.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Whiteout_Survival",
        "Results": [
            {"FirstURL": "https://www.whiteoutsurvival.com", "Text": "Official site"}
        ],
        "RelatedTopics": [
            {"FirstURL": "https://duckduckgo.com/Century_Games", "Text": "Century Games - Publisher of the game"},
            {"Name": "Genres", "Topics": [
                {"FirstURL": "https://duckduckgo.com/4X", "Text": "4X - Strategy genre"}
            ]},
            {"FirstURL": "", "Text": "broken"}
        ]
    }"#;

    #[test]
    fn test_parse_flattens_groups() {
        let results = parse_results(SAMPLE, 10).unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Whiteout Survival", "Official site", "Century Games", "4X"]
        );
        assert_eq!(results[2].snippet, "Publisher of the game");
        assert_eq!(results[3].url, "https://duckduckgo.com/4X");
    }

    #[test]
    fn test_parse_respects_limit_and_empty_docs() {
        assert_eq!(parse_results(SAMPLE, 2).unwrap().len(), 2);
        assert!(parse_results("{}", 5).unwrap().is_empty());
        assert!(parse_results("not json", 5).is_err());
    }

    #[test]
    fn test_clamp_results() {
        assert_eq!(clamp_results(None), 3);
        assert_eq!(clamp_results(Some(0)), 1);
        assert_eq!(clamp_results(Some(9)), 5);
    }

    #[test]
    fn test_render_truncates() {
        let short = render(&parse_results(SAMPLE, 1).unwrap());
        assert!(short.starts_with("**Whiteout Survival**\n"));
        assert!(short.ends_with("<https://en.wikipedia.org/wiki/Whiteout_Survival>"));

        let long: Vec<SearchResult> = (0..5)
            .map(|i| SearchResult {
                title: format!("Result {i}"),
                url: "https://example.test".to_string(),
                snippet: "x".repeat(600),
            })
            .collect();
        let rendered = render(&long);
        assert!(rendered.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            rendered.chars().count(),
            MAX_RENDERED_LEN + TRUNCATION_MARKER.chars().count()
        );
    }
}
