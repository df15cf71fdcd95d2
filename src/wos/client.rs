//! HTTP client for the gift code API.
//!
//! All three endpoints take a signed form body and answer with
//! `{"code": 0, "msg": "...", "data": ..., "err_code": ...}`. A non-zero `code`
//! is not a transport error: for `/api/gift_code` it carries the redemption
//! outcome, so [`GiftApi::redeem`] returns the raw reply.

use crate::{
    config::app::WosConfig,
    errors::{Error, Result},
    wos::sign,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 300;

/// Wait suggested when the API rate limits without a `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Player profile returned by `/api/player`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerData {
    /// Player id (numeric in the API)
    pub fid: u64,
    /// In-game nickname
    pub nickname: String,
    /// State number
    pub kid: i32,
    /// Raw furnace level
    pub stove_lv: i32,
    /// Furnace icon URL for fire crystal levels, a number otherwise
    #[serde(default)]
    pub stove_lv_content: serde_json::Value,
    /// Avatar URL
    #[serde(default)]
    pub avatar_image: String,
}

impl PlayerData {
    /// The furnace icon, when the API sent a URL.
    #[must_use]
    pub fn stove_icon(&self) -> Option<String> {
        match &self.stove_lv_content {
            serde_json::Value::String(url) if url.starts_with("http") => Some(url.clone()),
            _ => None,
        }
    }
}

/// Reply of `/api/gift_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    /// 0 on success
    pub code: i64,
    /// Human-readable message (e.g. `"RECEIVED."`)
    pub msg: String,
    /// Numeric error code when present
    pub err_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    err_code: serde_json::Value,
}

impl RawReply {
    fn err_code(&self) -> Option<i64> {
        match &self.err_code {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Operations of the gift code API used by the bot.
#[async_trait]
pub trait GiftApi: Send + Sync {
    /// Looks up a player. This also "logs in" the player for redemption.
    ///
    /// # Errors
    /// * [`Error::PlayerNotFound`] - The game does not know this id
    /// * [`Error::RateLimited`] / [`Error::Upstream`] - HTTP 429 or another non-success status
    /// * [`Error::Api`] - Any other non-zero reply code
    async fn player(&self, fid: &str) -> Result<PlayerData>;

    /// Fetches a CAPTCHA image for the player.
    ///
    /// # Returns
    /// The decoded image bytes, ready for a [`crate::wos::CaptchaSolver`].
    ///
    /// # Errors
    /// [`Error::RateLimited`] when CAPTCHAs are requested too often,
    /// [`Error::Captcha`] for other refusals or a malformed image.
    async fn captcha(&self, fid: &str) -> Result<Vec<u8>>;

    /// Submits a code with a CAPTCHA answer.
    ///
    /// Game-level failures such as an expired code are not errors; they come
    /// back in the [`ApiReply`] for [`crate::wos::RedeemOutcome::classify`].
    ///
    /// # Errors
    /// Only transport and HTTP status failures.
    async fn redeem(&self, fid: &str, code: &str, captcha: &str) -> Result<ApiReply>;
}

/// `reqwest` implementation of [`GiftApi`].
#[derive(Debug, Clone)]
pub struct WosClient {
    http: reqwest::Client,
    base: String,
    secret: String,
    timeout: Duration,
}

impl WosClient {
    /// Creates a client from the `[wos]` section. `http` is shared with the rest of the bot.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &WosConfig) -> Self {
        Self {
            http,
            base: config.api_base.trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn now_ms() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string()
    }

    async fn post(&self, path: &str, params: &[(&str, String)]) -> Result<RawReply> {
        let body = sign::sign_form(params, &self.secret);
        let url = format!("{}{path}", self.base);
        debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ORIGIN, &self.base)
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs);
            return Err(Error::RateLimited { retry_after });
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str(&text).map_err(|_| Error::Upstream {
            status: status.as_u16(),
            body: truncate(&text, MAX_ERROR_BODY),
        })
    }
}

/// Whether an API message means the player id does not exist.
pub(crate) fn is_player_missing(msg: &str) -> bool {
    let msg = msg.to_lowercase().replace('_', " ");
    msg.contains("not") && (msg.contains("exist") || msg.contains("found"))
}

/// Decodes `data:image/...;base64,<payload>` (or a bare base64 payload).
pub(crate) fn decode_data_url(img: &str) -> Result<Vec<u8>> {
    let payload = img.split_once(',').map_or(img, |(_, data)| data);
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Captcha {
            message: format!("Invalid captcha image: {e}"),
        })
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl GiftApi for WosClient {
    #[instrument(skip(self))]
    async fn player(&self, fid: &str) -> Result<PlayerData> {
        let reply = self
            .post(
                "/api/player",
                &[("fid", fid.to_string()), ("time", Self::now_ms())],
            )
            .await?;

        if reply.code != 0 {
            if is_player_missing(&reply.msg) {
                return Err(Error::PlayerNotFound {
                    fid: fid.to_string(),
                });
            }
            return Err(Error::Api { message: reply.msg });
        }
        serde_json::from_value(reply.data).map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn captcha(&self, fid: &str) -> Result<Vec<u8>> {
        let reply = self
            .post(
                "/api/captcha",
                &[
                    ("fid", fid.to_string()),
                    ("init", "0".to_string()),
                    ("time", Self::now_ms()),
                ],
            )
            .await?;

        if reply.code != 0 {
            if reply.msg.to_uppercase().contains("TOO FREQUENT") {
                return Err(Error::RateLimited {
                    retry_after: DEFAULT_RETRY_AFTER,
                });
            }
            return Err(Error::Captcha { message: reply.msg });
        }

        let img = reply
            .data
            .get("img")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::Captcha {
                message: "Captcha reply without image".to_string(),
            })?;
        decode_data_url(img)
    }

    #[instrument(skip(self))]
    async fn redeem(&self, fid: &str, code: &str, captcha: &str) -> Result<ApiReply> {
        let reply = self
            .post(
                "/api/gift_code",
                &[
                    ("captcha_code", captcha.to_string()),
                    ("cdk", code.to_string()),
                    ("fid", fid.to_string()),
                    ("time", Self::now_ms()),
                ],
            )
            .await?;

        let err_code = reply.err_code();
        Ok(ApiReply {
            code: reply.code,
            msg: reply.msg,
            err_code,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_player_data_parses_api_shape() {
        let json = r#"{
            "fid": 123456789,
            "nickname": "Anna",
            "kid": 1234,
            "stove_lv": 36,
            "stove_lv_content": "https://cdn.example/fc1.png",
            "avatar_image": "https://cdn.example/a.png"
        }"#;
        let data: PlayerData = serde_json::from_str(json).unwrap();
        assert_eq!(data.fid, 123_456_789);
        assert_eq!(data.stove_icon().as_deref(), Some("https://cdn.example/fc1.png"));

        let plain = r#"{"fid": 1, "nickname": "B", "kid": 1, "stove_lv": 20, "stove_lv_content": 20}"#;
        let data: PlayerData = serde_json::from_str(plain).unwrap();
        assert!(data.stove_icon().is_none());
        assert!(data.avatar_image.is_empty());
    }

    #[test]
    fn test_raw_reply_err_code_variants() {
        let numeric: RawReply =
            serde_json::from_str(r#"{"code":1,"msg":"RECEIVED.","err_code":40008}"#).unwrap();
        assert_eq!(numeric.err_code(), Some(40008));

        let text: RawReply =
            serde_json::from_str(r#"{"code":1,"msg":"USED.","err_code":"40005"}"#).unwrap();
        assert_eq!(text.err_code(), Some(40005));

        let empty: RawReply = serde_json::from_str(r#"{"code":0,"msg":"SUCCESS","err_code":""}"#).unwrap();
        assert_eq!(empty.err_code(), None);
    }

    #[test]
    fn test_is_player_missing() {
        assert!(is_player_missing("role not exist."));
        assert!(is_player_missing("ROLE_NOT_FOUND"));
        assert!(!is_player_missing("params error"));
    }

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(decode_data_url("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(Error::Captcha { .. })
        ));
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = WosConfig {
            api_base: "https://example.test/".to_string(),
            ..WosConfig::default()
        };
        let client = WosClient::new(reqwest::Client::new(), &config);
        assert_eq!(client.base, "https://example.test");
        assert_eq!(client.timeout, Duration::from_secs(20));
    }
}
