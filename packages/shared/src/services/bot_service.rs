use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::services::chess_service::ChessService;

#[cfg(test)]
use mockall::automock;

/// Source of candidate moves for the computer side. `None` is a normal answer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MoveSuggester: Send + Sync {
    async fn suggest(&self, fen: &str) -> Option<String>;
}

/// Picks a uniformly random legal move.
#[derive(Clone, Default)]
pub struct RandomMoveSuggester {
    chess: ChessService,
}

impl RandomMoveSuggester {
    pub fn new() -> Self {
        Self::default()
    }

    fn pick(&self, fen: &str) -> Option<String> {
        let position = self.chess.decode(fen).ok()?;
        let moves = self.chess.legal_moves(&position);
        moves.choose(&mut rand::thread_rng()).cloned()
    }
}

#[async_trait]
impl MoveSuggester for RandomMoveSuggester {
    async fn suggest(&self, fen: &str) -> Option<String> {
        self.pick(fen)
    }
}

/// Asks an external UCI engine binary for its best move at a fixed depth.
#[derive(Debug, Clone)]
pub struct UciEngineSuggester {
    path: String,
    depth: u32,
    timeout: Duration,
}

impl UciEngineSuggester {
    pub fn new(path: &str, depth: u32, timeout: Duration) -> Self {
        UciEngineSuggester {
            path: path.to_string(),
            depth,
            timeout,
        }
    }

    async fn query(&self, fen: &str) -> std::io::Result<Option<String>> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        let commands = format!(
            "uci\nisready\nucinewgame\nposition fen {}\ngo depth {}\n",
            fen, self.depth
        );
        stdin.write_all(commands.as_bytes()).await?;
        stdin.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let Some(rest) = line.strip_prefix("bestmove") else {
                continue;
            };
            let _ = stdin.write_all(b"quit\n").await;
            return Ok(match rest.split_whitespace().next() {
                Some("(none)") | None => None,
                Some(code) => Some(code.to_string()),
            });
        }
        Ok(None)
    }
}

#[async_trait]
impl MoveSuggester for UciEngineSuggester {
    async fn suggest(&self, fen: &str) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.query(fen)).await {
            Ok(Ok(suggestion)) => {
                debug!("Engine suggested {:?}", suggestion);
                suggestion
            }
            Ok(Err(e)) => {
                warn!("Engine at {} failed: {}", self.path, e);
                None
            }
            Err(_) => {
                warn!("Engine at {} timed out after {:?}", self.path, self.timeout);
                None
            }
        }
    }
}

/// Tries `primary` first and asks `secondary` when it has no answer.
pub struct FallbackSuggester {
    primary: Arc<dyn MoveSuggester>,
    secondary: Arc<dyn MoveSuggester>,
}

impl FallbackSuggester {
    pub fn new(primary: Arc<dyn MoveSuggester>, secondary: Arc<dyn MoveSuggester>) -> Self {
        FallbackSuggester { primary, secondary }
    }
}

#[async_trait]
impl MoveSuggester for FallbackSuggester {
    async fn suggest(&self, fen: &str) -> Option<String> {
        match self.primary.suggest(fen).await {
            Some(code) => Some(code),
            None => self.secondary.suggest(fen).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[tokio::test]
    async fn test_random_suggestion_is_legal() {
        let chess = ChessService::new();
        let suggester = RandomMoveSuggester::new();

        let suggestion = suggester.suggest(START_FEN).await.unwrap();

        assert!(chess.legal(&chess.initial_position(), &suggestion));
    }

    #[tokio::test]
    async fn test_random_suggestion_without_moves() {
        let chess = ChessService::new();
        let mut position = chess.initial_position();
        for code in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            position = chess.apply(&position, code).unwrap().position;
        }
        let suggester = RandomMoveSuggester::new();

        assert_eq!(suggester.suggest(&chess.encode(&position)).await, None);
        assert_eq!(suggester.suggest("garbage").await, None);
    }

    #[tokio::test]
    async fn test_missing_engine_binary_yields_none() {
        let suggester = UciEngineSuggester::new(
            "/nonexistent/engine-binary",
            10,
            Duration::from_millis(500),
        );

        assert_eq!(suggester.suggest(START_FEN).await, None);
    }

    #[tokio::test]
    async fn test_fallback_uses_secondary() {
        let mut primary = MockMoveSuggester::new();
        primary.expect_suggest().times(1).returning(|_| None);
        let mut secondary = MockMoveSuggester::new();
        secondary
            .expect_suggest()
            .times(1)
            .returning(|_| Some("e2e4".to_string()));

        let suggester = FallbackSuggester::new(Arc::new(primary), Arc::new(secondary));

        assert_eq!(suggester.suggest(START_FEN).await, Some("e2e4".to_string()));
    }

    #[tokio::test]
    async fn test_fallback_prefers_primary() {
        let mut primary = MockMoveSuggester::new();
        primary
            .expect_suggest()
            .returning(|_| Some("d2d4".to_string()));
        let mut secondary = MockMoveSuggester::new();
        secondary.expect_suggest().times(0);

        let suggester = FallbackSuggester::new(Arc::new(primary), Arc::new(secondary));

        assert_eq!(suggester.suggest(START_FEN).await, Some("d2d4".to_string()));
    }
}
