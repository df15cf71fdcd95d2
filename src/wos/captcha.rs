//! CAPTCHA solving.
//!
//! The gift code endpoint wants a 4-character answer read from a noisy image.
//! OCR runs out of process; the bot only ships the image over HTTP and checks
//! the shape of what comes back.

use crate::{
    config::app::CaptchaConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Length of every CAPTCHA answer.
pub const CAPTCHA_LEN: usize = 4;

/// An answer proposed by a solver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptchaSolution {
    /// The recognized text
    pub code: String,
    /// Solver confidence in `0.0..=1.0`
    #[serde(default)]
    pub confidence: f32,
    /// Which recognizer produced the answer
    #[serde(default)]
    pub method: String,
}

impl CaptchaSolution {
    /// Answer trimmed of whitespace.
    #[must_use]
    pub fn answer(&self) -> &str {
        self.code.trim()
    }
}

/// Turns a CAPTCHA image into text.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solves `image` (raw PNG/JPEG bytes).
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Captcha`] when no answer could be produced.
    async fn solve(&self, image: &[u8]) -> Result<CaptchaSolution>;
}

/// Exactly four ASCII letters or digits.
#[must_use]
pub fn is_valid_format(answer: &str) -> bool {
    answer.len() == CAPTCHA_LEN && answer.chars().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Serialize)]
struct SolveRequest<'a> {
    image: &'a str,
}

/// Solver backed by an OCR service reachable over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteSolver {
    http: reqwest::Client,
    url: String,
}

impl RemoteSolver {
    /// Creates a solver posting to `[captcha].solver_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &CaptchaConfig) -> Self {
        Self {
            http,
            url: config.solver_url.clone(),
        }
    }
}

#[async_trait]
impl CaptchaSolver for RemoteSolver {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn solve(&self, image: &[u8]) -> Result<CaptchaSolution> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let response = self
            .http
            .post(&self.url)
            .json(&SolveRequest { image: &encoded })
            .send()
            .await
            .map_err(|e| Error::Captcha {
                message: format!("Solver unreachable: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Captcha {
                message: format!("Solver returned HTTP {}", status.as_u16()),
            });
        }

        let solution: CaptchaSolution = response.json().await?;
        debug!(
            "Solver answered '{}' ({:.2}, {})",
            solution.code, solution.confidence, solution.method
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_is_valid_format() {
        assert!(is_valid_format("a1B2"));
        assert!(is_valid_format("ZZZZ"));
        assert!(!is_valid_format("abc"));
        assert!(!is_valid_format("abcde"));
        assert!(!is_valid_format("ab-1"));
        assert!(!is_valid_format("ab1é"));
        assert!(!is_valid_format(""));
    }

    #[test]
    fn test_solution_parses_minimal_reply() {
        let solution: CaptchaSolution = serde_json::from_str(r#"{"code":" k3x9 "}"#).unwrap();
        assert_eq!(solution.answer(), "k3x9");
        assert!(solution.confidence.abs() < f32::EPSILON);
        assert!(solution.method.is_empty());
    }
}
