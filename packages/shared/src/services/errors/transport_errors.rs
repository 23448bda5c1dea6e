#[derive(Debug, PartialEq, Eq)]
pub enum TransportError {
    Closed,
    Send(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Closed => write!(f, "Connection closed"),
            TransportError::Send(msg) => write!(f, "Send failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
