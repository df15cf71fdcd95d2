//! Liveness endpoint for container platforms.

use crate::errors::Result;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `"ok"` while the process runs
    pub status: &'static str,
    /// Current UTC time, RFC 3339
    pub time: String,
}

async fn root() -> &'static str {
    "OK"
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Routes served by the health server.
pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// Serves [`router`] on `0.0.0.0:port` until the process exits.
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health server listening on {addr}");
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Runs [`serve`] in the background, logging failures.
pub fn spawn(port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port).await {
            error!("Health server stopped: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_is_plain_ok() {
        assert_eq!(root().await, "OK");
    }

    #[tokio::test]
    async fn test_health_reports_time() {
        let Json(status) = health().await;
        assert_eq!(status.status, "ok");
        assert!(chrono::DateTime::parse_from_rfc3339(&status.time).is_ok());

        let body = serde_json::to_value(&status).unwrap_or_default();
        assert_eq!(body["status"], "ok");
    }
}
