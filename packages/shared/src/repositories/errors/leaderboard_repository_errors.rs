#[derive(Debug)]
pub enum LeaderboardRepositoryError {
    Redis(String),
}

impl std::fmt::Display for LeaderboardRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardRepositoryError::Redis(msg) => write!(f, "Redis error: {}", msg),
        }
    }
}

impl std::error::Error for LeaderboardRepositoryError {}

impl From<redis::RedisError> for LeaderboardRepositoryError {
    fn from(err: redis::RedisError) -> Self {
        LeaderboardRepositoryError::Redis(err.to_string())
    }
}
