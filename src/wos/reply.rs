//! Classification of gift code API replies.

use crate::entities::CodeStatus;
use std::fmt;

/// What the game said about a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Reward delivered
    Success,
    /// The player already claimed this code
    AlreadyClaimed,
    /// The player already claimed a code of the same type
    SameType,
    /// The code's time window has passed
    Expired,
    /// The code does not exist
    InvalidCode,
    /// The code's usage limit was reached
    UsageLimit,
    /// The CAPTCHA answer was wrong
    CaptchaError,
    /// CAPTCHA answers are being sent too fast
    CaptchaTooFrequent,
    /// The player session expired
    NotLoggedIn,
    /// Server-side timeout, try again
    Timeout,
    /// Anything else, with the raw message
    Unknown(String),
}

impl RedeemOutcome {
    /// Maps the API's `msg` (and `err_code` as a fallback) to an outcome.
    ///
    /// Messages are compared without case or a trailing period. Unknown
    /// messages keep their text in [`RedeemOutcome::Unknown`].
    #[must_use]
    pub fn classify(msg: &str, err_code: Option<i64>) -> Self {
        let normalized = msg.trim().trim_end_matches('.').to_uppercase();
        match normalized.as_str() {
            "SUCCESS" => Self::Success,
            "RECEIVED" => Self::AlreadyClaimed,
            "SAME TYPE EXCHANGE" => Self::SameType,
            "TIME ERROR" => Self::Expired,
            "CDK NOT FOUND" => Self::InvalidCode,
            "USED" => Self::UsageLimit,
            "CAPTCHA CHECK ERROR" => Self::CaptchaError,
            "CAPTCHA CHECK TOO FREQUENT" => Self::CaptchaTooFrequent,
            "NOT LOGIN" => Self::NotLoggedIn,
            "TIMEOUT RETRY" => Self::Timeout,
            _ => match err_code {
                Some(20000) => Self::Success,
                Some(40008) => Self::AlreadyClaimed,
                Some(40011) => Self::SameType,
                Some(40007) => Self::Expired,
                Some(40014) => Self::InvalidCode,
                Some(40005) => Self::UsageLimit,
                _ => Self::Unknown(msg.trim().to_string()),
            },
        }
    }

    /// Stable key stored in the redemption log.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AlreadyClaimed => "already_claimed",
            Self::SameType => "same_type",
            Self::Expired => "expired",
            Self::InvalidCode => "invalid_code",
            Self::UsageLimit => "usage_limit",
            Self::CaptchaError => "captcha_error",
            Self::CaptchaTooFrequent => "captcha_too_frequent",
            Self::NotLoggedIn => "not_logged_in",
            Self::Timeout => "timeout",
            Self::Unknown(_) => "unknown",
        }
    }

    /// The player holds the reward; never retry.
    #[must_use]
    pub const fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyClaimed | Self::SameType)
    }

    /// The code cannot succeed for anyone anymore.
    #[must_use]
    pub const fn invalidates_code(&self) -> bool {
        self.code_status().is_some()
    }

    /// Status the code moves to after this outcome, if any.
    #[must_use]
    pub const fn code_status(&self) -> Option<CodeStatus> {
        match self {
            Self::Expired => Some(CodeStatus::Expired),
            Self::InvalidCode => Some(CodeStatus::Invalid),
            Self::UsageLimit => Some(CodeStatus::Exhausted),
            _ => None,
        }
    }

    /// A later attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CaptchaError | Self::CaptchaTooFrequent | Self::NotLoggedIn | Self::Timeout
        )
    }
}

impl fmt::Display for RedeemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "redeemed"),
            Self::AlreadyClaimed => write!(f, "already claimed"),
            Self::SameType => write!(f, "same type already claimed"),
            Self::Expired => write!(f, "code expired"),
            Self::InvalidCode => write!(f, "code not found"),
            Self::UsageLimit => write!(f, "usage limit reached"),
            Self::CaptchaError => write!(f, "captcha rejected"),
            Self::CaptchaTooFrequent => write!(f, "captcha too frequent"),
            Self::NotLoggedIn => write!(f, "not logged in"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unknown(msg) => write!(f, "unknown reply: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::giftcode::SUCCESS_OUTCOMES;

    #[test]
    fn test_classify_messages() {
        assert_eq!(RedeemOutcome::classify("SUCCESS", None), RedeemOutcome::Success);
        assert_eq!(
            RedeemOutcome::classify("RECEIVED.", None),
            RedeemOutcome::AlreadyClaimed
        );
        assert_eq!(
            RedeemOutcome::classify("SAME TYPE EXCHANGE.", None),
            RedeemOutcome::SameType
        );
        assert_eq!(RedeemOutcome::classify("TIME ERROR.", None), RedeemOutcome::Expired);
        assert_eq!(
            RedeemOutcome::classify("CDK NOT FOUND.", None),
            RedeemOutcome::InvalidCode
        );
        assert_eq!(RedeemOutcome::classify("USED.", None), RedeemOutcome::UsageLimit);
        assert_eq!(
            RedeemOutcome::classify("CAPTCHA CHECK ERROR.", None),
            RedeemOutcome::CaptchaError
        );
        assert_eq!(
            RedeemOutcome::classify("CAPTCHA CHECK TOO FREQUENT.", None),
            RedeemOutcome::CaptchaTooFrequent
        );
        assert_eq!(RedeemOutcome::classify("NOT LOGIN.", None), RedeemOutcome::NotLoggedIn);
        assert_eq!(
            RedeemOutcome::classify(" timeout retry. ", None),
            RedeemOutcome::Timeout
        );
    }

    #[test]
    fn test_classify_falls_back_to_err_code() {
        assert_eq!(
            RedeemOutcome::classify("something new", Some(40014)),
            RedeemOutcome::InvalidCode
        );
        assert_eq!(
            RedeemOutcome::classify("something new", None),
            RedeemOutcome::Unknown("something new".to_string())
        );
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(RedeemOutcome::Success.is_terminal_success());
        assert!(RedeemOutcome::SameType.is_terminal_success());
        assert!(!RedeemOutcome::CaptchaError.is_terminal_success());

        assert_eq!(RedeemOutcome::UsageLimit.code_status(), Some(CodeStatus::Exhausted));
        assert_eq!(RedeemOutcome::InvalidCode.code_status(), Some(CodeStatus::Invalid));
        assert!(RedeemOutcome::Expired.invalidates_code());
        assert!(!RedeemOutcome::Success.invalidates_code());

        assert!(RedeemOutcome::Timeout.is_retryable());
        assert!(!RedeemOutcome::UsageLimit.is_retryable());
    }

    #[test]
    fn test_success_keys_match_log_keys() {
        for outcome in [
            RedeemOutcome::Success,
            RedeemOutcome::AlreadyClaimed,
            RedeemOutcome::SameType,
        ] {
            assert!(SUCCESS_OUTCOMES.contains(&outcome.key()));
        }
        assert!(!SUCCESS_OUTCOMES.contains(&RedeemOutcome::Timeout.key()));
    }
}
