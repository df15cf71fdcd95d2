/// Application settings loaded from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Secrets and deployment values read from environment variables
pub mod secrets;

pub use app::{AppConfig, load_app_configuration};
