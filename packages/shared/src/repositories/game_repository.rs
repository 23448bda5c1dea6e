use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tokio::sync::Mutex;

use crate::models::game_record::{GameCompletion, GameRecord, NewGame, PersistedMove};
use crate::models::game_session::MoveRecord;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Key of the item holding the last allocated game id.
const COUNTER_GAME_ID: &str = "0";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Persists a new match and returns its stable integer id.
    async fn create_game(&self, game: &NewGame) -> Result<u64, GameRepositoryError>;
    async fn append_move(&self, game_id: u64, record: &MoveRecord)
        -> Result<(), GameRepositoryError>;
    async fn finalize_game(
        &self,
        game_id: u64,
        completion: &GameCompletion,
    ) -> Result<(), GameRepositoryError>;
    async fn get_game(&self, game_id: u64) -> Result<GameRecord, GameRepositoryError>;
    async fn get_moves(&self, game_id: u64) -> Result<Vec<PersistedMove>, GameRepositoryError>;
}

pub struct DynamoDbGameRepository {
    pub client: Client,
    pub games_table: String,
    pub moves_table: String,
}

impl DynamoDbGameRepository {
    pub fn new(client: Client, games_table: &str, moves_table: &str) -> Self {
        Self {
            client,
            games_table: games_table.to_string(),
            moves_table: moves_table.to_string(),
        }
    }

    async fn next_game_id(&self) -> Result<u64, GameRepositoryError> {
        let output = self
            .client
            .update_item()
            .table_name(&self.games_table)
            .key("game_id", AttributeValue::N(COUNTER_GAME_ID.to_string()))
            .update_expression("ADD last_game_id :one")
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        output
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get("last_game_id"))
            .and_then(|value| value.as_n().ok())
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| {
                GameRepositoryError::Serialization("Missing last_game_id counter".to_string())
            })
    }
}

#[async_trait]
impl GameRepository for DynamoDbGameRepository {
    async fn create_game(&self, game: &NewGame) -> Result<u64, GameRepositoryError> {
        let game_id = self.next_game_id().await?;
        let record = GameRecord::new(game_id, game);
        let item =
            to_item(&record).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.games_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(game_id)")
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        Ok(game_id)
    }

    async fn append_move(
        &self,
        game_id: u64,
        record: &MoveRecord,
    ) -> Result<(), GameRepositoryError> {
        let item = to_item(PersistedMove::new(game_id, record))
            .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.moves_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn finalize_game(
        &self,
        game_id: u64,
        completion: &GameCompletion,
    ) -> Result<(), GameRepositoryError> {
        let value = |v: serde_json::Value| -> Result<AttributeValue, GameRepositoryError> {
            to_attribute_value(v).map_err(|e| GameRepositoryError::Serialization(e.to_string()))
        };

        self.client
            .update_item()
            .table_name(&self.games_table)
            .key("game_id", AttributeValue::N(game_id.to_string()))
            .update_expression(
                "SET #status = :status, #result = :result, winner_id = :winner_id, \
                 pgn = :pgn, moves = :moves, completed_at = :completed_at",
            )
            .condition_expression("attribute_exists(game_id)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_names("#result", "result")
            .expression_attribute_values(":status", value(serde_json::json!("completed"))?)
            .expression_attribute_values(":result", value(serde_json::json!(completion.result))?)
            .expression_attribute_values(
                ":winner_id",
                value(serde_json::json!(completion.winner_id))?,
            )
            .expression_attribute_values(":pgn", value(serde_json::json!(completion.pgn))?)
            .expression_attribute_values(":moves", value(serde_json::json!(completion.moves))?)
            .expression_attribute_values(
                ":completed_at",
                value(serde_json::json!(completion.completed_at))?,
            )
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn get_game(&self, game_id: u64) -> Result<GameRecord, GameRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.games_table)
            .key("game_id", AttributeValue::N(game_id.to_string()))
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                from_item(item).map_err(|e| GameRepositoryError::Serialization(e.to_string()))
            }
            None => Err(GameRepositoryError::NotFound),
        }
    }

    async fn get_moves(&self, game_id: u64) -> Result<Vec<PersistedMove>, GameRepositoryError> {
        let output = self
            .client
            .query()
            .table_name(&self.moves_table)
            .key_condition_expression("game_id = :game_id")
            .expression_attribute_values(":game_id", AttributeValue::N(game_id.to_string()))
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                from_item(item).map_err(|e| GameRepositoryError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[derive(Default)]
struct StoredGames {
    last_game_id: u64,
    games: HashMap<u64, GameRecord>,
    moves: HashMap<u64, Vec<PersistedMove>>,
}

/// Process-local persistence used when no games table is configured.
#[derive(Default)]
pub struct InMemoryGameRepository {
    state: Mutex<StoredGames>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn create_game(&self, game: &NewGame) -> Result<u64, GameRepositoryError> {
        let mut state = self.state.lock().await;
        state.last_game_id += 1;
        let game_id = state.last_game_id;
        state.games.insert(game_id, GameRecord::new(game_id, game));
        Ok(game_id)
    }

    async fn append_move(
        &self,
        game_id: u64,
        record: &MoveRecord,
    ) -> Result<(), GameRepositoryError> {
        let mut state = self.state.lock().await;
        if !state.games.contains_key(&game_id) {
            return Err(GameRepositoryError::NotFound);
        }
        state
            .moves
            .entry(game_id)
            .or_default()
            .push(PersistedMove::new(game_id, record));
        Ok(())
    }

    async fn finalize_game(
        &self,
        game_id: u64,
        completion: &GameCompletion,
    ) -> Result<(), GameRepositoryError> {
        let mut state = self.state.lock().await;
        let record = state
            .games
            .get_mut(&game_id)
            .ok_or(GameRepositoryError::NotFound)?;
        record.complete(completion);
        Ok(())
    }

    async fn get_game(&self, game_id: u64) -> Result<GameRecord, GameRepositoryError> {
        self.state
            .lock()
            .await
            .games
            .get(&game_id)
            .cloned()
            .ok_or(GameRepositoryError::NotFound)
    }

    async fn get_moves(&self, game_id: u64) -> Result<Vec<PersistedMove>, GameRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .moves
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_session::SessionStatus;
    use crate::models::outcome::Outcome;
    use chrono::Utc;

    fn bot_game() -> NewGame {
        NewGame {
            white_player_id: "white_player".to_string(),
            black_player_id: None,
            is_bot_game: true,
        }
    }

    #[tokio::test]
    async fn test_game_ids_are_sequential() {
        let repository = InMemoryGameRepository::new();

        let first = repository.create_game(&bot_game()).await.unwrap();
        let second = repository.create_game(&bot_game()).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_moves_and_finalize() {
        let repository = InMemoryGameRepository::new();
        let game_id = repository.create_game(&bot_game()).await.unwrap();

        repository
            .append_move(
                game_id,
                &MoveRecord {
                    move_number: 1,
                    notation: "e4".to_string(),
                    move_code: "e2e4".to_string(),
                    fen_after: "fen".to_string(),
                },
            )
            .await
            .unwrap();
        repository
            .finalize_game(
                game_id,
                &GameCompletion {
                    result: Outcome::WhiteWins,
                    winner_id: Some("white_player".to_string()),
                    pgn: "1. e4 1-0".to_string(),
                    moves: vec!["e4".to_string()],
                    completed_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let moves = repository.get_moves(game_id).await.unwrap();
        let record = repository.get_game(game_id).await.unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].move_san, "e4");
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.result, Some(Outcome::WhiteWins));
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let repository = InMemoryGameRepository::new();

        assert!(matches!(
            repository.get_game(99).await,
            Err(GameRepositoryError::NotFound)
        ));
    }
}
