use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use shared::models::game_session::SessionSnapshot;
use shared::models::matchmaking::{requests::FindMatchRequest, responses::MatchmakingResponse};
use tracing::{error, info};

use crate::{error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/game/find-match", post(find_match))
        .route("/game/{game_id}/state", get(game_state))
}

/// Holds the request open until the player is paired or handed a bot.
async fn find_match(
    State(state): State<AppState>,
    Json(payload): Json<FindMatchRequest>,
) -> Result<Json<MatchmakingResponse>, ApiError> {
    if payload.player_id.trim().is_empty() || payload.username.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "player_id and username are required".to_string(),
        ));
    }

    info!("Player {} is looking for a game", payload.player_id);
    state
        .match_service
        .find_match(&payload.player_id, &payload.username)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Matchmaking failed for {}: {}", payload.player_id, e);
            ApiError::from(e)
        })
}

async fn game_state(
    State(state): State<AppState>,
    Path(game_id): Path<u64>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.match_service.state(game_id).await?))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::app;
    use crate::state::AppState;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use shared::config::Settings;
    use shared::models::game_session::BOT_USERNAME;
    use shared::models::matchmaking::responses::{MatchmakingResponse, MatchmakingStatus};

    fn quick_settings() -> Settings {
        Settings {
            matchmaking_timeout: Duration::from_millis(50),
            matchmaking_poll_interval: Duration::from_millis(10),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_find_match_assigns_bot_when_alone() {
        let server = TestServer::new(app(AppState::in_memory(&quick_settings()))).unwrap();

        let response = server
            .post("/game/find-match")
            .json(&json!({"player_id": "alice", "username": "Alice"}))
            .await;

        response.assert_status_ok();
        let body: MatchmakingResponse = response.json();
        assert_eq!(body.status, MatchmakingStatus::BotGame);
        assert_eq!(body.opponent.as_deref(), Some(BOT_USERNAME));

        let state = server
            .get(&format!("/game/{}/state", body.game_id.unwrap()))
            .await;
        state.assert_status_ok();
        let snapshot: serde_json::Value = state.json();
        assert_eq!(snapshot["white_player_id"], "alice");
        assert_eq!(snapshot["is_bot_game"], true);
        assert_eq!(snapshot["turn"], "white");
    }

    #[tokio::test]
    async fn test_find_match_requires_identity() {
        let server = TestServer::new(app(AppState::in_memory(&quick_settings()))).unwrap();

        let response = server
            .post("/game/find-match")
            .json(&json!({"player_id": " ", "username": "Alice"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_game_state_is_not_found() {
        let server = TestServer::new(app(AppState::in_memory(&Settings::default()))).unwrap();

        let response = server.get("/game/999/state").await;

        response.assert_status_not_found();
    }
}
