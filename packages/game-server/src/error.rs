use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::services::errors::{
    leaderboard_service_errors::LeaderboardServiceError, match_service_errors::MatchError,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    Match(MatchError),
    Leaderboard(LeaderboardServiceError),
    NotFound(String),
    BadRequest(String),
}

impl From<MatchError> for ApiError {
    fn from(error: MatchError) -> Self {
        ApiError::Match(error)
    }
}

impl From<LeaderboardServiceError> for ApiError {
    fn from(error: LeaderboardServiceError) -> Self {
        ApiError::Leaderboard(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Match(e) => {
                let status = match e {
                    MatchError::NotFound(_) => StatusCode::NOT_FOUND,
                    MatchError::NotParticipant => StatusCode::FORBIDDEN,
                    MatchError::OutOfTurn
                    | MatchError::IllegalMove(_)
                    | MatchError::InvalidMove(_)
                    | MatchError::MatchOver
                    | MatchError::AlreadyExists(_) => StatusCode::CONFLICT,
                    MatchError::Matchmaking(_) | MatchError::Persistence(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    MatchError::PositionDesync(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Leaderboard(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
