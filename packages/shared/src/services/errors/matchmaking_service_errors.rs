use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;

#[derive(Debug)]
pub enum MatchmakingServiceError {
    RepositoryError(QueueRepositoryError),
    IncompleteResult,
}

impl std::fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchmakingServiceError::RepositoryError(err) => {
                write!(f, "Queue store error: {}", err)
            }
            MatchmakingServiceError::IncompleteResult => {
                write!(f, "Match result carries neither a match id nor an opponent token")
            }
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}

impl From<QueueRepositoryError> for MatchmakingServiceError {
    fn from(err: QueueRepositoryError) -> Self {
        MatchmakingServiceError::RepositoryError(err)
    }
}
