//! Language model access for `/ask`.
//!
//! Several API keys are pooled: each request tries the healthy keys in a
//! random order, failing keys are rested or cut off by a circuit breaker, and
//! identical conversations are answered from a cache.

pub mod backend;
pub mod pool;

pub use backend::{ChatBackend, ChatMessage, OpenRouterBackend};
pub use pool::{KeyPool, KeyState, KeyStatus};

use crate::{
    config::app::LlmConfig,
    errors::{Error, Result},
};
use md5::{Digest, Md5};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Answer given when no key is configured.
pub const NO_KEYS_PLACEHOLDER: &str =
    "Placeholder: No API keys configured. Please set OPENROUTER_API_KEY_1 in .env for real responses.";

/// Usage figures for `/ask` diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmStats {
    /// Requests that missed the cache
    pub total_requests: u64,
    /// Requests answered from the cache
    pub cache_hits: u64,
    /// `cache_hits / max(total_requests, 1)`
    pub cache_hit_rate: f64,
    /// Per-key state
    pub keys: Vec<KeyReport>,
}

/// Per-key figures.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyReport {
    /// Position in the pool
    pub index: usize,
    /// Status label
    pub status: &'static str,
    /// Share of successful requests
    pub success_rate: f64,
    /// Requests sent
    pub total: u64,
    /// Requests that succeeded
    pub successful: u64,
    /// Mean recent latency
    pub average_response_time: Duration,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

/// Pooled, cached access to the chat completions API.
pub struct LlmManager {
    pool: KeyPool,
    backend: Arc<dyn ChatBackend>,
    cache: Mutex<HashMap<String, String>>,
    max_retries: u32,
    base_backoff: Duration,
    max_tokens: u32,
    system_prompt: String,
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
}

/// Cache key of a conversation.
#[must_use]
pub fn cache_key(messages: &[ChatMessage]) -> String {
    let serialized = serde_json::to_string(messages).unwrap_or_default();
    let digest = Md5::digest(serialized.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl LlmManager {
    /// Creates a manager over `keys` from the `[llm]` section.
    pub fn new(keys: Vec<String>, backend: Arc<dyn ChatBackend>, config: &LlmConfig) -> Self {
        if keys.is_empty() {
            warn!("No API keys loaded. /ask will answer with a placeholder.");
        } else {
            info!("Loaded {} language model key(s), model {}", keys.len(), config.model);
        }
        Self {
            pool: KeyPool::new(
                keys,
                config.failure_threshold,
                Duration::from_secs(config.circuit_open_secs),
                Duration::from_secs(config.rate_limit_secs),
            ),
            backend,
            cache: Mutex::new(HashMap::new()),
            max_retries: config.max_retries.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Answers a single question under the configured system prompt.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(question),
        ];
        self.complete(&messages).await
    }

    /// Completes a conversation.
    ///
    /// # Errors
    /// Returns [`Error::Llm`] when every round over the pool failed.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.pool.is_empty() {
            return Ok(NO_KEYS_PLACEHOLDER.to_string());
        }

        let key = cache_key(messages);
        if let Some(cached) = self.cache.lock().await.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            info!("Cache hit for language model request");
            return Ok(cached.clone());
        }
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut order: Vec<usize> = (0..self.pool.len()).collect();
        order.shuffle(&mut rand::rng());

        for attempt in 0..self.max_retries {
            for &index in &order {
                if !self.pool.is_healthy(index).await {
                    continue;
                }
                let Some(secret) = self.pool.key(index) else {
                    continue;
                };

                let started = Instant::now();
                match self.backend.complete(secret, messages, self.max_tokens).await {
                    Ok(text) => {
                        self.pool.record_success(index, started.elapsed()).await;
                        self.cache.lock().await.insert(key, text.clone());
                        info!("Language model answered with key {}", index + 1);
                        return Ok(text);
                    }
                    Err(e) => {
                        self.pool.record_failure(index, &e.to_string()).await;
                        warn!("Language model request failed with key {}: {e}", index + 1);
                        let backoff = self
                            .base_backoff
                            .saturating_mul(2_u32.saturating_pow(attempt));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        let message = format!("All API requests failed after {} attempts", self.max_retries);
        error!("{message}");
        Err(Error::Llm { message })
    }

    /// Request, cache and per-key figures.
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> LlmStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let keys = self
            .pool
            .snapshot()
            .await
            .into_iter()
            .map(|state| KeyReport {
                index: state.index,
                status: state.status.as_str(),
                success_rate: state.success_rate(),
                total: state.total,
                successful: state.successful,
                average_response_time: state.average_response_time(),
                consecutive_failures: state.consecutive_failures,
            })
            .collect();

        LlmStats {
            total_requests,
            cache_hits,
            cache_hit_rate: cache_hits as f64 / total_requests.max(1) as f64,
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Backend failing for the listed keys and echoing otherwise.
    #[derive(Default)]
    struct FakeBackend {
        failing: Vec<String>,
        message: String,
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn complete(&self, key: &str, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
            self.calls.lock().unwrap().push(key.to_string());
            if self.failing.iter().any(|k| k == key) {
                return Err(Error::Upstream {
                    status: 500,
                    body: self.message.clone(),
                });
            }
            Ok(format!("echo: {}", messages.last().map(|m| m.content.as_str()).unwrap_or_default()))
        }
    }

    fn config() -> LlmConfig {
        LlmConfig {
            max_retries: 2,
            base_backoff_ms: 1,
            ..LlmConfig::default()
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_no_keys_gives_placeholder() -> Result<()> {
        let manager = LlmManager::new(Vec::new(), Arc::new(FakeBackend::default()), &config());
        assert_eq!(manager.ask("hello").await?, NO_KEYS_PLACEHOLDER);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_question_hits_cache() -> Result<()> {
        init_test_tracing();
        let backend = Arc::new(FakeBackend::default());
        let manager = LlmManager::new(keys(&["a"]), backend.clone(), &config());

        assert_eq!(manager.ask("hello").await?, "echo: hello");
        assert_eq!(manager.ask("hello").await?, "echo: hello");
        assert_eq!(backend.calls.lock().unwrap().len(), 1);

        let stats = manager.stats().await;
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.cache_hits, 1);
        assert!((stats.cache_hit_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.keys[0].successful, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_key_falls_over_to_healthy_one() -> Result<()> {
        let backend = Arc::new(FakeBackend {
            failing: keys(&["bad"]),
            message: "boom".to_string(),
            ..FakeBackend::default()
        });
        let manager = LlmManager::new(keys(&["bad", "good"]), backend.clone(), &config());

        assert_eq!(manager.ask("hi").await?, "echo: hi");
        assert!(backend.calls.lock().unwrap().contains(&"good".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_all_keys_failing_is_an_error() {
        let backend = Arc::new(FakeBackend {
            failing: keys(&["a", "b"]),
            message: "boom".to_string(),
            ..FakeBackend::default()
        });
        let manager = LlmManager::new(keys(&["a", "b"]), backend.clone(), &config());

        let result = manager.ask("hi").await;
        assert!(matches!(result, Err(Error::Llm { .. })));
        // two rounds over two keys
        assert_eq!(backend.calls.lock().unwrap().len(), 4);

        let stats = manager.stats().await;
        assert!(stats.keys.iter().all(|k| k.consecutive_failures == 2));
    }

    #[tokio::test]
    async fn test_rate_limited_key_is_skipped_next_round() {
        let backend = Arc::new(FakeBackend {
            failing: keys(&["a"]),
            message: "rate limit exceeded".to_string(),
            ..FakeBackend::default()
        });
        let manager = LlmManager::new(keys(&["a"]), backend.clone(), &config());

        assert!(manager.ask("hi").await.is_err());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
        assert_eq!(manager.stats().await.keys[0].status, "rate_limited");
    }

    #[test]
    fn test_cache_key_is_stable_md5() {
        let a = [ChatMessage::user("hi")];
        let b = [ChatMessage::user("hi")];
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_eq!(cache_key(&a).len(), 32);
        assert_ne!(cache_key(&a), cache_key(&[ChatMessage::user("ho")]));
    }
}
