use crate::{
    repositories::errors::game_repository_errors::GameRepositoryError,
    services::errors::{
        chess_service_errors::ChessServiceError,
        matchmaking_service_errors::MatchmakingServiceError,
        session_registry_errors::SessionRegistryError,
    },
};

#[derive(Debug)]
pub enum MatchError {
    NotFound(u64),
    NotParticipant,
    OutOfTurn,
    IllegalMove(String),
    InvalidMove(String),
    MatchOver,
    PositionDesync(String),
    AlreadyExists(u64),
    Matchmaking(MatchmakingServiceError),
    Persistence(GameRepositoryError),
}

impl MatchError {
    /// Machine-readable code carried on `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "not_found",
            MatchError::NotParticipant => "not_participant",
            MatchError::OutOfTurn => "out_of_turn",
            MatchError::IllegalMove(_) => "illegal_move",
            MatchError::InvalidMove(_) => "invalid_move",
            MatchError::MatchOver => "match_over",
            MatchError::PositionDesync(_) => "position_desync",
            MatchError::AlreadyExists(_) => "already_exists",
            MatchError::Matchmaking(_) => "matchmaking_unavailable",
            MatchError::Persistence(_) => "persistence_unavailable",
        }
    }
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::NotFound(match_id) => write!(f, "Game {} not found", match_id),
            MatchError::NotParticipant => write!(f, "Not a player in this game"),
            MatchError::OutOfTurn => write!(f, "Not your turn"),
            MatchError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            MatchError::InvalidMove(msg) => write!(f, "Invalid move: {}", msg),
            MatchError::MatchOver => write!(f, "Game is already over"),
            MatchError::PositionDesync(msg) => write!(f, "Position out of sync: {}", msg),
            MatchError::AlreadyExists(match_id) => write!(f, "Game {} already exists", match_id),
            MatchError::Matchmaking(err) => write!(f, "Matchmaking error: {}", err),
            MatchError::Persistence(err) => write!(f, "Persistence error: {}", err),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<ChessServiceError> for MatchError {
    fn from(err: ChessServiceError) -> Self {
        match err {
            ChessServiceError::IllegalMove(msg) => MatchError::IllegalMove(msg),
            ChessServiceError::InvalidMove(msg) => MatchError::InvalidMove(msg),
            ChessServiceError::InvalidPosition(msg) => MatchError::PositionDesync(msg),
        }
    }
}

impl From<MatchmakingServiceError> for MatchError {
    fn from(err: MatchmakingServiceError) -> Self {
        MatchError::Matchmaking(err)
    }
}

impl From<GameRepositoryError> for MatchError {
    fn from(err: GameRepositoryError) -> Self {
        MatchError::Persistence(err)
    }
}

impl From<SessionRegistryError> for MatchError {
    fn from(err: SessionRegistryError) -> Self {
        match err {
            SessionRegistryError::AlreadyExists(match_id) => MatchError::AlreadyExists(match_id),
        }
    }
}
