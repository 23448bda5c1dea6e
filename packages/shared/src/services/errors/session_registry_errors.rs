#[derive(Debug, PartialEq, Eq)]
pub enum SessionRegistryError {
    AlreadyExists(u64),
}

impl std::fmt::Display for SessionRegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionRegistryError::AlreadyExists(match_id) => {
                write!(f, "Session {} already exists", match_id)
            }
        }
    }
}

impl std::error::Error for SessionRegistryError {}
