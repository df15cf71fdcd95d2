//! Core business logic - framework-agnostic operations over the database.
//!
//! Nothing in here knows about Discord; the bot layer calls these functions
//! and turns their results into replies.

/// Permission management
pub mod admin;
/// Alliance registration and lookup
pub mod alliance;
/// Event guides
pub mod events;
/// Furnace level labels
pub mod furnace;
/// Gift codes and redemption outcomes
pub mod giftcode;
/// Alliance rosters
pub mod member;
/// Change monitoring configuration and detection
pub mod monitor;
/// Persisted redemption queue
pub mod queue;
/// Key-value bookkeeping
pub mod state;
/// State timeline milestones
pub mod timeline;
