use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shared::models::leaderboard::{LeaderboardEntry, LeaderboardResponse};

use crate::{error::ApiError, state::AppState};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(top_players))
        .route("/leaderboard/{player_id}", get(player_rank))
}

async fn top_players(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Ok(Json(state.match_service.leaderboard().top(limit).await?))
}

async fn player_rank(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<LeaderboardEntry>, ApiError> {
    state
        .match_service
        .leaderboard()
        .rank(&player_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Player {} has no ranking", player_id)))
}
