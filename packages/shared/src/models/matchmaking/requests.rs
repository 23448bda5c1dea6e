use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FindMatchRequest {
    pub player_id: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_match_request_deserialization() {
        let json = r#"{"player_id": "player-1", "username": "alice"}"#;

        let request: FindMatchRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.player_id, "player-1");
        assert_eq!(request.username, "alice");
    }
}
