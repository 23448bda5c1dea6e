#[derive(Debug)]
pub enum QueueRepositoryError {
    Serialization(String),
    Redis(String),
}

impl std::fmt::Display for QueueRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            QueueRepositoryError::Redis(msg) => write!(f, "Redis error: {}", msg),
        }
    }
}

impl std::error::Error for QueueRepositoryError {}

impl From<redis::RedisError> for QueueRepositoryError {
    fn from(err: redis::RedisError) -> Self {
        QueueRepositoryError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for QueueRepositoryError {
    fn from(err: serde_json::Error) -> Self {
        QueueRepositoryError::Serialization(err.to_string())
    }
}
