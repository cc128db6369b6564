//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

use crate::dispatch::BotDispatcher;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub bot_username: Option<String>,
    pub uptime_secs: u64,
    /// Entries in the live registry, admin commands included.
    pub entries: usize,
}

/// Shared application state for health checks
#[derive(Clone)]
pub struct AppState {
    pub start_time: SystemTime,
    pub bot_username: Arc<RwLock<Option<String>>>,
    pub dispatcher: Arc<BotDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<BotDispatcher>) -> Self {
        Self {
            start_time: SystemTime::now(),
            bot_username: Arc::new(RwLock::new(None)),
            dispatcher,
        }
    }

    pub async fn set_bot_username(&self, username: String) {
        let mut guard = self.bot_username.write().await;
        *guard = Some(username);
    }
}

impl TypeMapKey for AppState {
    type Value = AppState;
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let bot_username = state.bot_username.read().await.clone();
    let status = if bot_username.is_some() {
        "ok"
    } else {
        "starting"
    };

    (
        StatusCode::OK,
        Json(HealthStatus {
            status: status.to_string(),
            bot_username,
            uptime_secs: uptime,
            entries: state.dispatcher.registry().len(),
        }),
    )
}

async fn live_handler() -> StatusCode {
    StatusCode::OK
}

/// Create the health check router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/live", get(live_handler))
        .with_state(state)
}

/// Start the health check server
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_health_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Health check server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reply_store::CsvStore;
    use tempfile::TempDir;

    use crate::dispatch::Dispatcher;

    fn state(dir: &TempDir) -> AppState {
        let responses = dir.path().join("replies.csv");
        std::fs::write(&responses, "hello,Hi,0,\n").unwrap();
        let store = CsvStore::new(responses, dir.path().join("locks.csv"));
        AppState::new(Arc::new(Dispatcher::load(Arc::new(store)).unwrap()))
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        assert!(state.bot_username.read().await.is_none());
    }

    #[tokio::test]
    async fn test_set_bot_username() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        state.set_bot_username("replybot".to_string()).await;
        assert_eq!(
            *state.bot_username.read().await,
            Some("replybot".to_string())
        );
    }

    #[tokio::test]
    async fn test_health_reports_starting_then_ok() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let (code, Json(before)) = health_handler(State(state.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(before.status, "starting");
        // Five admin commands plus one reply
        assert_eq!(before.entries, 6);

        state.set_bot_username("replybot".to_string()).await;
        let (_, Json(after)) = health_handler(State(state)).await;
        assert_eq!(after.status, "ok");
        assert_eq!(after.bot_username.as_deref(), Some("replybot"));
    }

    #[tokio::test]
    async fn test_live() {
        assert_eq!(live_handler().await, StatusCode::OK);
    }

    #[test]
    fn test_health_status_serde() {
        let status = HealthStatus {
            status: "ok".to_string(),
            bot_username: Some("replybot".to_string()),
            uptime_secs: 100,
            entries: 7,
        };
        let json = serde_json::to_string(&status).unwrap();
        let back: HealthStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, "ok");
        assert_eq!(back.uptime_secs, 100);
        assert_eq!(back.entries, 7);
        assert_eq!(back.bot_username, Some("replybot".to_string()));
    }
}
