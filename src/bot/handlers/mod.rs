//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions that are not
//! commands: autocomplete and plain messages.

/// Autocomplete handlers for alliance names, gift codes and events
pub mod autocomplete;
/// Reactions to player ids posted in chat
pub mod message;
