use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    models::{
        game_session::PlayerRef,
        leaderboard::{LeaderboardEntry, LeaderboardResponse},
        outcome::{Color, Outcome},
    },
    repositories::leaderboard_repository::LeaderboardRepository,
    services::errors::leaderboard_service_errors::LeaderboardServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsTable {
    pub win: i64,
    pub draw: i64,
    pub loss: i64,
}

impl Default for PointsTable {
    fn default() -> Self {
        PointsTable {
            win: 10,
            draw: 3,
            loss: 0,
        }
    }
}

/// Points earned by each side of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardedPoints {
    pub white: i64,
    pub black: i64,
}

impl PointsTable {
    pub fn for_outcome(&self, outcome: Outcome) -> AwardedPoints {
        let for_side = |color: Color| match outcome.winner() {
            Some(winner) if winner == color => self.win,
            Some(_) => self.loss,
            None => self.draw,
        };
        AwardedPoints {
            white: for_side(Color::White),
            black: for_side(Color::Black),
        }
    }
}

#[derive(Clone)]
pub struct LeaderboardService {
    repository: Arc<dyn LeaderboardRepository + Send + Sync>,
    points: PointsTable,
}

impl LeaderboardService {
    pub fn new(repository: Arc<dyn LeaderboardRepository + Send + Sync>, points: PointsTable) -> Self {
        LeaderboardService { repository, points }
    }

    pub fn points(&self) -> PointsTable {
        self.points
    }

    /// Credits both human sides; `black` is `None` for the bot.
    ///
    /// Store failures are logged and do not change the returned award.
    pub async fn apply_outcome(
        &self,
        outcome: Outcome,
        white: &PlayerRef,
        black: Option<&PlayerRef>,
    ) -> AwardedPoints {
        let awarded = self.points.for_outcome(outcome);

        let sides = [(Some(white), awarded.white), (black, awarded.black)];
        for (player, delta) in sides {
            let Some(player) = player else {
                continue;
            };
            if delta == 0 {
                continue;
            }
            match self
                .repository
                .apply_delta(&player.id, &player.username, delta)
                .await
            {
                Ok(total) => info!(
                    "Awarded {} points to {} (total {})",
                    delta, player.id, total
                ),
                Err(e) => warn!("Failed to award {} points to {}: {}", delta, player.id, e),
            }
        }

        awarded
    }

    pub async fn top(&self, limit: usize) -> Result<LeaderboardResponse, LeaderboardServiceError> {
        let entries = self.repository.top(limit).await?;
        let total_players = self.repository.total().await?;
        Ok(LeaderboardResponse {
            entries,
            total_players,
        })
    }

    pub async fn rank(
        &self,
        player_id: &str,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardServiceError> {
        Ok(self.repository.rank(player_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;
    use crate::repositories::leaderboard_repository::{
        InMemoryLeaderboardRepository, MockLeaderboardRepository,
    };
    use mockall::predicate::eq;
    use rstest::rstest;

    #[rstest]
    #[case(Outcome::WhiteWins, 10, 0)]
    #[case(Outcome::BlackWins, 0, 10)]
    #[case(Outcome::Draw, 3, 3)]
    fn test_points_table(#[case] outcome: Outcome, #[case] white: i64, #[case] black: i64) {
        let awarded = PointsTable::default().for_outcome(outcome);

        assert_eq!(awarded, AwardedPoints { white, black });
    }

    #[tokio::test]
    async fn test_win_credits_only_the_winner() {
        let repository = Arc::new(InMemoryLeaderboardRepository::new());
        let service = LeaderboardService::new(repository.clone(), PointsTable::default());

        service
            .apply_outcome(
                Outcome::BlackWins,
                &PlayerRef::new("alice", "Alice"),
                Some(&PlayerRef::new("bob", "Bob")),
            )
            .await;

        let board = service.top(10).await.unwrap();
        assert_eq!(board.total_players, 1);
        assert_eq!(board.entries[0].player_id, "bob");
        assert_eq!(board.entries[0].points, 10);
    }

    #[tokio::test]
    async fn test_draw_credits_both_sides() {
        let repository = Arc::new(InMemoryLeaderboardRepository::new());
        let service = LeaderboardService::new(repository, PointsTable::default());

        service
            .apply_outcome(
                Outcome::Draw,
                &PlayerRef::new("alice", "Alice"),
                Some(&PlayerRef::new("bob", "Bob")),
            )
            .await;

        assert_eq!(service.rank("alice").await.unwrap().unwrap().points, 3);
        assert_eq!(service.rank("bob").await.unwrap().unwrap().points, 3);
    }

    #[tokio::test]
    async fn test_bot_side_is_skipped() {
        let mut repository = MockLeaderboardRepository::new();
        repository
            .expect_apply_delta()
            .with(eq("alice"), eq("Alice"), eq(3))
            .times(1)
            .returning(|_, _, delta| Ok(delta));
        let service = LeaderboardService::new(Arc::new(repository), PointsTable::default());

        let awarded = service
            .apply_outcome(Outcome::Draw, &PlayerRef::new("alice", "Alice"), None)
            .await;

        assert_eq!(awarded, AwardedPoints { white: 3, black: 3 });
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let mut repository = MockLeaderboardRepository::new();
        repository
            .expect_apply_delta()
            .times(1)
            .returning(|_, _, _| Err(LeaderboardRepositoryError::Redis("down".to_string())));
        let service = LeaderboardService::new(Arc::new(repository), PointsTable::default());

        let awarded = service
            .apply_outcome(Outcome::WhiteWins, &PlayerRef::new("alice", "Alice"), None)
            .await;

        assert_eq!(awarded.white, 10);
    }
}
