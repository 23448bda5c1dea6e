use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::models::events::{ClientMessage, ServerEvent};
use shared::services::connection_hub::EventSink;
use shared::services::errors::match_service_errors::MatchError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub const CLOSE_NOT_PARTICIPANT: u16 = 4003;
pub const CLOSE_NOT_FOUND: u16 = 4004;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub player_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/game/{game_id}", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(game_id): Path<u64>,
    Query(params): Query<ConnectParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, game_id, params.player_id))
}

pub fn close_code(err: &MatchError) -> u16 {
    match err {
        MatchError::NotFound(_) | MatchError::MatchOver => CLOSE_NOT_FOUND,
        _ => CLOSE_NOT_PARTICIPANT,
    }
}

/// Decodes one text frame, or the `error` event to send back instead.
pub fn parse_frame(text: &str) -> Result<ClientMessage, ServerEvent> {
    serde_json::from_str(text).map_err(|e| {
        ServerEvent::error("invalid_message", format!("Could not parse message: {}", e))
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, game_id: u64, player_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let sink: Arc<dyn EventSink> = Arc::new(tx);
    let service = state.match_service.clone();

    let connection_id = match service.connect(game_id, &player_id, sink).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Refused {} on game {}: {}", player_id, game_id, e);
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: close_code(&e),
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };
    info!("Player {} connected to game {}", player_id, game_id);

    // Ends when the hub drops this connection's sender.
    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Could not serialize {} event: {}", event.kind(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut reader = tokio::spawn({
        let service = service.clone();
        let player_id = player_id.clone();
        async move {
            while let Some(Ok(message)) = receiver.next().await {
                match message {
                    Message::Text(text) => match parse_frame(text.as_str()) {
                        Ok(message) => service.handle_message(game_id, &player_id, message).await,
                        Err(event) => {
                            service.hub().unicast(game_id, &player_id, &event);
                        }
                    },
                    Message::Close(_) => break,
                    _ => debug!("Ignoring non-text frame from {}", player_id),
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    service.disconnect(game_id, &player_id, connection_id).await;
    info!("Player {} left game {}", player_id, game_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use axum_test::{TestServer, TestWebSocket, WsMessage};
    use serde_json::json;
    use shared::config::Settings;
    use shared::models::game_session::PlayerRef;
    use shared::models::outcome::{Color, EndReason, Outcome};
    use shared::services::errors::matchmaking_service_errors::MatchmakingServiceError;

    async fn live_game() -> (TestServer, AppState, u64) {
        let state = AppState::in_memory(&Settings::default());
        let game_id = state
            .match_service
            .start_match(
                &PlayerRef::new("alice", "Alice"),
                Some(&PlayerRef::new("bob", "Bob")),
            )
            .await
            .unwrap();
        let server = TestServer::builder()
            .http_transport()
            .build(app(state.clone()))
            .unwrap();
        (server, state, game_id)
    }

    async fn open(server: &TestServer, game_id: u64, player_id: &str) -> TestWebSocket {
        server
            .get_websocket(&format!("/ws/game/{}", game_id))
            .add_query_param("player_id", player_id)
            .await
            .into_websocket()
            .await
    }

    async fn joined(server: &TestServer, game_id: u64, player_id: &str) -> TestWebSocket {
        let mut socket = open(server, game_id, player_id).await;
        match socket.receive_json::<ServerEvent>().await {
            ServerEvent::GameState(state) => assert_eq!(state.game_id, game_id),
            other => panic!("Expected game_state, got {:?}", other),
        }
        socket
    }

    async fn close_code_of(socket: &mut TestWebSocket) -> u16 {
        match socket.receive_message().await {
            WsMessage::Close(Some(frame)) => u16::from(frame.code),
            other => panic!("Expected close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_move_reaches_both_players() {
        let (server, _state, game_id) = live_game().await;
        let mut white = joined(&server, game_id, "alice").await;
        let mut black = joined(&server, game_id, "bob").await;

        white.send_json(&json!({"type": "move", "move": "e2e4"})).await;

        for socket in [&mut white, &mut black] {
            match socket.receive_json::<ServerEvent>().await {
                ServerEvent::Move(event) => {
                    assert_eq!(event.move_san, "e4");
                    assert_eq!(event.turn, Color::Black);
                }
                other => panic!("Expected move, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_unparseable_frame_gets_error_event() {
        let (server, _state, game_id) = live_game().await;
        let mut white = joined(&server, game_id, "alice").await;

        white.send_text("not json").await;

        match white.receive_json::<ServerEvent>().await {
            ServerEvent::Error { code, .. } => assert_eq!(code, "invalid_message"),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connections_get_close_codes() {
        let (server, _state, game_id) = live_game().await;

        let mut unknown = open(&server, 999, "alice").await;
        let mut stranger = open(&server, game_id, "mallory").await;

        assert_eq!(close_code_of(&mut unknown).await, CLOSE_NOT_FOUND);
        assert_eq!(close_code_of(&mut stranger).await, CLOSE_NOT_PARTICIPANT);
    }

    #[tokio::test]
    async fn test_socket_closes_after_game_over() {
        let (server, state, game_id) = live_game().await;
        let mut white = joined(&server, game_id, "alice").await;
        let mut black = joined(&server, game_id, "bob").await;

        white.send_json(&json!({"type": "resign"})).await;

        for socket in [&mut white, &mut black] {
            let mut over = vec![];
            for _ in 0..2 {
                match socket.receive_json::<ServerEvent>().await {
                    ServerEvent::GameOver(event) => over.push(event),
                    other => panic!("Expected game_over, got {:?}", other),
                }
            }
            assert_eq!(over[1].result, Outcome::BlackWins);
            assert_eq!(over[1].reason, EndReason::Resignation);
            assert!(matches!(
                socket.receive_message().await,
                WsMessage::Close(_)
            ));
        }
        assert!(state.match_service.registry().get(game_id).is_none());
    }

    #[tokio::test]
    async fn test_closing_socket_notifies_opponent() {
        let (server, state, game_id) = live_game().await;
        let mut white = joined(&server, game_id, "alice").await;
        let mut black = joined(&server, game_id, "bob").await;

        black.close().await;

        assert_eq!(
            white.receive_json::<ServerEvent>().await,
            ServerEvent::opponent_disconnected(Color::Black)
        );
        assert!(!state.match_service.hub().is_connected(game_id, "bob"));
        assert!(state.match_service.registry().get(game_id).is_some());
    }

    #[test]
    fn test_parse_frame() {
        assert_eq!(
            parse_frame(r#"{"type":"move","move":"e2e4"}"#),
            Ok(ClientMessage::Move {
                move_code: "e2e4".to_string()
            })
        );
        assert_eq!(parse_frame(r#"{"type":"resign"}"#), Ok(ClientMessage::Resign));
        assert_eq!(
            parse_frame(r#"{"type":"get_state"}"#),
            Ok(ClientMessage::GetState)
        );
    }

    #[test]
    fn test_unparseable_frame_becomes_error_event() {
        match parse_frame("not json") {
            Err(ServerEvent::Error { code, .. }) => assert_eq!(code, "invalid_message"),
            other => panic!("Expected error event, got {:?}", other),
        }
        assert!(parse_frame(r#"{"type":"castle"}"#).is_err());
    }

    #[test]
    fn test_close_codes() {
        assert_eq!(close_code(&MatchError::NotFound(3)), CLOSE_NOT_FOUND);
        assert_eq!(close_code(&MatchError::MatchOver), CLOSE_NOT_FOUND);
        assert_eq!(close_code(&MatchError::NotParticipant), CLOSE_NOT_PARTICIPANT);
        assert_eq!(
            close_code(&MatchError::Matchmaking(
                MatchmakingServiceError::IncompleteResult
            )),
            CLOSE_NOT_PARTICIPANT
        );
    }
}
