use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub queue_size: u64,
    pub active_matches: usize,
}

/// Liveness plus a glance at load. A queue store outage reports `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = &state.match_service;
    let (status, queue_size) = match service.queue_size().await {
        Ok(size) => ("healthy", size),
        Err(e) => {
            warn!("Queue store unavailable for health check: {}", e);
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        queue_size,
        active_matches: service.registry().len(),
    })
}

#[cfg(test)]
mod tests {
    use crate::app;
    use crate::state::AppState;
    use axum_test::TestServer;
    use shared::config::Settings;

    #[tokio::test]
    async fn test_health_check() {
        let server = TestServer::new(app(AppState::in_memory(&Settings::default()))).unwrap();

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["queue_size"], 0);
        assert_eq!(body["active_matches"], 0);
    }
}
