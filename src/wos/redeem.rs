//! One player, one code: the redemption attempt loop.

use crate::{
    config::app::{CaptchaConfig, RedemptionConfig},
    errors::Result,
    wos::{
        captcha::{CaptchaSolver, is_valid_format},
        client::GiftApi,
        reply::RedeemOutcome,
        retry::RetryPolicy,
    },
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

/// Counters over the lifetime of a [`Redeemer`].
#[derive(Debug, Default)]
pub struct RedeemStats {
    solver_calls: AtomicU64,
    valid_formats: AtomicU64,
    submissions: AtomicU64,
    captcha_accepted: AtomicU64,
    captcha_rejected: AtomicU64,
}

/// Point-in-time copy of [`RedeemStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Images sent to the solver
    pub solver_calls: u64,
    /// Answers that passed the format and confidence checks
    pub valid_formats: u64,
    /// Answers submitted to the game
    pub submissions: u64,
    /// Submissions whose CAPTCHA the game accepted
    pub captcha_accepted: u64,
    /// Submissions rejected with a CAPTCHA error
    pub captcha_rejected: u64,
}

impl RedeemStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            solver_calls: self.solver_calls.load(Ordering::Relaxed),
            valid_formats: self.valid_formats.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            captcha_accepted: self.captcha_accepted.load(Ordering::Relaxed),
            captcha_rejected: self.captcha_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Redeems gift codes for single players.
pub struct Redeemer {
    api: Arc<dyn GiftApi>,
    solver: Arc<dyn CaptchaSolver>,
    policy: RetryPolicy,
    captcha_attempts: u32,
    min_confidence: f32,
    stats: RedeemStats,
}

impl Redeemer {
    /// Creates a redeemer from the `[redemption]` and `[captcha]` sections.
    pub fn new(
        api: Arc<dyn GiftApi>,
        solver: Arc<dyn CaptchaSolver>,
        redemption: &RedemptionConfig,
        captcha: &CaptchaConfig,
    ) -> Self {
        Self {
            api,
            solver,
            policy: RetryPolicy::from_config(redemption),
            captcha_attempts: redemption.captcha_attempts.max(1),
            min_confidence: captcha.min_confidence,
            stats: RedeemStats::default(),
        }
    }

    /// The game API this redeemer talks to.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn GiftApi> {
        &self.api
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    async fn login(&self, fid: &str) -> Result<()> {
        let api = &self.api;
        self.policy.run(move || api.player(fid)).await?;
        Ok(())
    }

    /// Tries to redeem `code` for `fid`.
    ///
    /// Wrong CAPTCHA answers, throttling and expired sessions are retried for
    /// up to `captcha_attempts` rounds; any other outcome is returned as soon
    /// as the game reports it. When every round fails the last retryable
    /// outcome is returned.
    ///
    /// # Errors
    /// Returns an error when the player does not exist or the API stays
    /// unreachable after the retry policy gives up.
    #[instrument(skip(self))]
    pub async fn attempt(&self, fid: &str, code: &str) -> Result<RedeemOutcome> {
        self.login(fid).await?;

        let api = &self.api;
        let mut last = None;
        for round in 1..=self.captcha_attempts {
            let image = self.policy.run(move || api.captcha(fid)).await?;

            RedeemStats::bump(&self.stats.solver_calls);
            let solution = match self.solver.solve(&image).await {
                Ok(solution) => solution,
                Err(e) => {
                    warn!("Round {round}: solver failed: {e}");
                    continue;
                }
            };

            let answer = solution.answer();
            if !is_valid_format(answer) {
                debug!("Round {round}: discarding malformed answer '{answer}'");
                continue;
            }
            if solution.confidence < self.min_confidence {
                debug!(
                    "Round {round}: discarding '{answer}' at confidence {:.2}",
                    solution.confidence
                );
                continue;
            }
            RedeemStats::bump(&self.stats.valid_formats);

            let reply = self
                .policy
                .run(move || api.redeem(fid, code, answer))
                .await?;
            RedeemStats::bump(&self.stats.submissions);

            let outcome = RedeemOutcome::classify(&reply.msg, reply.err_code);
            match outcome {
                RedeemOutcome::CaptchaError => {
                    RedeemStats::bump(&self.stats.captcha_rejected);
                    debug!("Round {round}: captcha '{answer}' rejected");
                }
                RedeemOutcome::CaptchaTooFrequent => {
                    warn!(
                        "Round {round}: captcha throttled, waiting {:?}",
                        self.policy.cloudflare_backoff
                    );
                    tokio::time::sleep(self.policy.cloudflare_backoff).await;
                }
                RedeemOutcome::NotLoggedIn => {
                    RedeemStats::bump(&self.stats.captcha_accepted);
                    debug!("Round {round}: session expired, logging in again");
                    self.login(fid).await?;
                }
                RedeemOutcome::Timeout => {
                    RedeemStats::bump(&self.stats.captcha_accepted);
                    tokio::time::sleep(self.policy.base_backoff).await;
                }
                _ => {
                    RedeemStats::bump(&self.stats.captcha_accepted);
                    info!("{fid} / {code}: {outcome}");
                    return Ok(outcome);
                }
            }
            last = Some(outcome);
        }

        let outcome = last.unwrap_or(RedeemOutcome::CaptchaError);
        warn!(
            "{fid} / {code}: giving up after {} rounds ({outcome})",
            self.captcha_attempts
        );
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;
    use crate::wos::captcha::CaptchaSolution;
    use crate::wos::client::{ApiReply, PlayerData};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Game API answering redemptions from a script.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub replies: Mutex<VecDeque<&'static str>>,
        pub missing: Vec<String>,
        pub logins: AtomicU64,
        pub submitted: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeApi {
        pub fn scripted(replies: &[&'static str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().copied().collect()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl GiftApi for FakeApi {
        async fn player(&self, fid: &str) -> Result<PlayerData> {
            self.logins.fetch_add(1, Ordering::Relaxed);
            if self.missing.iter().any(|m| m == fid) {
                return Err(Error::PlayerNotFound {
                    fid: fid.to_string(),
                });
            }
            Ok(PlayerData {
                fid: fid.parse().unwrap_or_default(),
                nickname: format!("player-{fid}"),
                kid: 1234,
                stove_lv: 30,
                stove_lv_content: serde_json::Value::from(30),
                avatar_image: String::new(),
            })
        }

        async fn captcha(&self, _fid: &str) -> Result<Vec<u8>> {
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }

        async fn redeem(&self, fid: &str, code: &str, captcha: &str) -> Result<ApiReply> {
            self.submitted.lock().unwrap().push((
                fid.to_string(),
                code.to_string(),
                captcha.to_string(),
            ));
            let msg = self.replies.lock().unwrap().pop_front().unwrap_or("SUCCESS");
            Ok(ApiReply {
                code: i64::from(msg != "SUCCESS"),
                msg: msg.to_string(),
                err_code: None,
            })
        }
    }

    /// Solver returning scripted answers, then "abcd".
    #[derive(Default)]
    pub(crate) struct FakeSolver {
        pub answers: Mutex<VecDeque<(&'static str, f32)>>,
    }

    impl FakeSolver {
        pub fn scripted(answers: &[(&'static str, f32)]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl CaptchaSolver for FakeSolver {
        async fn solve(&self, _image: &[u8]) -> Result<CaptchaSolution> {
            let (code, confidence) = self
                .answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(("abcd", 0.9));
            Ok(CaptchaSolution {
                code: code.to_string(),
                confidence,
                method: "fake".to_string(),
            })
        }
    }

    pub(crate) fn fast_redemption_config() -> RedemptionConfig {
        RedemptionConfig {
            max_retries: 1,
            captcha_attempts: 3,
            base_backoff_ms: 1,
            cloudflare_backoff_secs: 0,
            server_error_backoff_secs: 0,
            member_delay_ms: 0,
        }
    }

    fn redeemer(api: Arc<FakeApi>, solver: FakeSolver) -> Redeemer {
        Redeemer::new(
            api,
            Arc::new(solver),
            &fast_redemption_config(),
            &CaptchaConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_success_on_first_round() -> Result<()> {
        init_test_tracing();
        let api = Arc::new(FakeApi::scripted(&["SUCCESS"]));
        let redeemer = redeemer(api.clone(), FakeSolver::default());

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::Success);

        let submitted = api.submitted.lock().unwrap().clone();
        assert_eq!(
            submitted,
            vec![(
                "123456789".to_string(),
                "FROST2025".to_string(),
                "abcd".to_string()
            )]
        );
        let stats = redeemer.stats();
        assert_eq!(stats.submissions, 1);
        assert_eq!(stats.captcha_accepted, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_captcha_is_retried() -> Result<()> {
        let api = Arc::new(FakeApi::scripted(&["CAPTCHA CHECK ERROR.", "RECEIVED."]));
        let redeemer = redeemer(api, FakeSolver::default());

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::AlreadyClaimed);

        let stats = redeemer.stats();
        assert_eq!(stats.captcha_rejected, 1);
        assert_eq!(stats.captcha_accepted, 1);
        assert_eq!(stats.submissions, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_and_unsure_answers_are_not_submitted() -> Result<()> {
        let api = Arc::new(FakeApi::scripted(&["SUCCESS"]));
        let solver = FakeSolver::scripted(&[("ab", 0.99), ("wxyz", 0.1), ("k3x9", 0.8)]);
        let redeemer = redeemer(api.clone(), solver);

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::Success);

        let submitted = api.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].2, "k3x9");

        let stats = redeemer.stats();
        assert_eq!(stats.solver_calls, 3);
        assert_eq!(stats.valid_formats, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_gives_up_with_last_outcome() -> Result<()> {
        let api = Arc::new(FakeApi::scripted(&[
            "CAPTCHA CHECK ERROR.",
            "CAPTCHA CHECK ERROR.",
            "CAPTCHA CHECK ERROR.",
        ]));
        let redeemer = redeemer(api.clone(), FakeSolver::default());

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::CaptchaError);
        assert_eq!(api.submitted.lock().unwrap().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_valid_answer_yields_captcha_error() -> Result<()> {
        let api = Arc::new(FakeApi::default());
        let solver = FakeSolver::scripted(&[("a", 0.9), ("b", 0.9), ("c", 0.9)]);
        let redeemer = redeemer(api.clone(), solver);

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::CaptchaError);
        assert!(api.submitted.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_session_logs_in_again() -> Result<()> {
        let api = Arc::new(FakeApi::scripted(&["NOT LOGIN.", "SUCCESS"]));
        let redeemer = redeemer(api.clone(), FakeSolver::default());

        let outcome = redeemer.attempt("123456789", "FROST2025").await?;
        assert_eq!(outcome, RedeemOutcome::Success);
        assert_eq!(api.logins.load(Ordering::Relaxed), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_code_level_outcome_returns_immediately() -> Result<()> {
        let api = Arc::new(FakeApi::scripted(&["CDK NOT FOUND.", "SUCCESS"]));
        let redeemer = redeemer(api.clone(), FakeSolver::default());

        let outcome = redeemer.attempt("123456789", "NOPE").await?;
        assert_eq!(outcome, RedeemOutcome::InvalidCode);
        assert_eq!(api.submitted.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_player_is_an_error() {
        let api = Arc::new(FakeApi {
            missing: vec!["987654321".to_string()],
            ..FakeApi::default()
        });
        let redeemer = redeemer(api, FakeSolver::default());

        let result = redeemer.attempt("987654321", "FROST2025").await;
        assert!(matches!(result, Err(Error::PlayerNotFound { .. })));
    }
}
