//! Unified error types for Frostkeeper.
//!
//! Every fallible function in the crate returns [`Result`]. Variants carry
//! enough context to be logged on their own; [`Error::is_user_facing`] decides
//! whether the message can be shown to the Discord user who triggered it.

use std::time::Duration;
use thiserror::Error;

/// All errors produced by the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input rejected before touching storage or the network
    #[error("{message}")]
    Validation {
        /// Human-readable explanation
        message: String,
    },

    /// The caller lacks the rights for the requested action
    #[error("Permission denied: {message}")]
    Permission {
        /// Why access was refused
        message: String,
    },

    /// No alliance matches the given name or id
    #[error("Alliance '{name}' not found")]
    AllianceNotFound {
        /// The name or id that was looked up
        name: String,
    },

    /// An alliance with this name already exists
    #[error("An alliance named '{name}' already exists")]
    AllianceExists {
        /// The conflicting name
        name: String,
    },

    /// No admin record exists for the user
    #[error("User {user_id} is not a bot administrator")]
    AdminNotFound {
        /// Discord user id
        user_id: String,
    },

    /// The gift code is not known to the bot
    #[error("Gift code '{code}' not found")]
    GiftCodeNotFound {
        /// The code that was looked up
        code: String,
    },

    /// A player id is not a 9-digit number
    #[error("Invalid player id(s): {id}")]
    InvalidPlayerId {
        /// Offending id(s), comma separated
        id: String,
    },

    /// The game API reports that the player does not exist
    #[error("Player {fid} not found")]
    PlayerNotFound {
        /// Player id
        fid: String,
    },

    /// A third-party API answered with a non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// A third-party API answered with a non-zero application code
    #[error("Upstream API error: {message}")]
    Api {
        /// Message reported by the API
        message: String,
    },

    /// The upstream asked us to slow down
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait before the next request
        retry_after: Duration,
    },

    /// CAPTCHA fetching or solving failed
    #[error("Captcha error: {message}")]
    Captcha {
        /// Details
        message: String,
    },

    /// Every LLM key failed or is unavailable
    #[error("Language model unavailable: {message}")]
    Llm {
        /// Details
        message: String,
    },

    /// Voice / music problems the user can act on
    #[error("{message}")]
    Voice {
        /// Details
        message: String,
    },

    /// Database errors from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing environment variables
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// String formatting errors
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Failure joining a voice channel
    #[error("Voice join error: {0}")]
    Join(#[from] songbird::error::JoinError),

    /// Serenity/Poise framework errors
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Permission`].
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Whether the message is meant for the Discord user rather than the logs.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Permission { .. }
                | Self::AllianceNotFound { .. }
                | Self::AllianceExists { .. }
                | Self::AdminNotFound { .. }
                | Self::GiftCodeNotFound { .. }
                | Self::InvalidPlayerId { .. }
                | Self::PlayerNotFound { .. }
                | Self::Voice { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
