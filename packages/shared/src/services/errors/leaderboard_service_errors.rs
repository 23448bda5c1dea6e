use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;

#[derive(Debug)]
pub enum LeaderboardServiceError {
    RepositoryError(LeaderboardRepositoryError),
}

impl std::fmt::Display for LeaderboardServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardServiceError::RepositoryError(err) => {
                write!(f, "Repository error: {}", err)
            }
        }
    }
}

impl std::error::Error for LeaderboardServiceError {}

impl From<LeaderboardRepositoryError> for LeaderboardServiceError {
    fn from(err: LeaderboardRepositoryError) -> Self {
        LeaderboardServiceError::RepositoryError(err)
    }
}
