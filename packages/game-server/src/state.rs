use std::sync::Arc;

use shared::config::Settings;
use shared::repositories::game_repository::{
    DynamoDbGameRepository, GameRepository, InMemoryGameRepository,
};
use shared::repositories::leaderboard_repository::{
    InMemoryLeaderboardRepository, LeaderboardRepository, RedisLeaderboardRepository,
};
use shared::repositories::queue_repository::{
    InMemoryQueueRepository, QueueRepository, RedisQueueRepository,
};
use shared::services::bot_service::{
    FallbackSuggester, MoveSuggester, RandomMoveSuggester, UciEngineSuggester,
};
use shared::services::connection_hub::ConnectionHub;
use shared::services::leaderboard_service::LeaderboardService;
use shared::services::match_service::MatchService;
use shared::services::matchmaking_service::MatchmakingService;
use shared::services::session_registry::SessionRegistry;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub match_service: Arc<MatchService>,
}

impl AppState {
    /// Wires the stores named in `settings`, falling back to in-process ones when unset.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (queue, leaderboard): (
            Arc<dyn QueueRepository + Send + Sync>,
            Arc<dyn LeaderboardRepository + Send + Sync>,
        ) = match &settings.redis_url {
            Some(url) => {
                info!("Using Redis at {} for the queue and leaderboard", url);
                (
                    Arc::new(RedisQueueRepository::connect(url).await?),
                    Arc::new(RedisLeaderboardRepository::connect(url).await?),
                )
            }
            None => {
                info!("REDIS_URL not set, queue and leaderboard are in-memory");
                (
                    Arc::new(InMemoryQueueRepository::new()),
                    Arc::new(InMemoryLeaderboardRepository::new()),
                )
            }
        };

        let games: Arc<dyn GameRepository + Send + Sync> = match &settings.games_table {
            Some(table) => {
                info!("Persisting games to DynamoDB table {}", table);
                let config = aws_config::load_from_env().await;
                let client = aws_sdk_dynamodb::Client::new(&config);
                Arc::new(DynamoDbGameRepository::new(
                    client,
                    table,
                    &settings.game_moves_table,
                ))
            }
            None => {
                info!("GAMES_TABLE not set, games are kept in-memory");
                Arc::new(InMemoryGameRepository::new())
            }
        };

        let suggester: Arc<dyn MoveSuggester> = Arc::new(FallbackSuggester::new(
            Arc::new(UciEngineSuggester::new(
                &settings.stockfish_path,
                settings.stockfish_depth,
                settings.stockfish_timeout,
            )),
            Arc::new(RandomMoveSuggester::new()),
        ));

        Ok(Self::assemble(settings, queue, leaderboard, games, suggester))
    }

    pub fn assemble(
        settings: &Settings,
        queue: Arc<dyn QueueRepository + Send + Sync>,
        leaderboard: Arc<dyn LeaderboardRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
        suggester: Arc<dyn MoveSuggester>,
    ) -> Self {
        let match_service = MatchService::new(
            SessionRegistry::new(),
            ConnectionHub::new(),
            MatchmakingService::new(queue, settings.matchmaking()),
            games,
            LeaderboardService::new(leaderboard, settings.points),
            suggester,
            settings.bot_move_delay,
        );

        AppState {
            match_service: Arc::new(match_service),
        }
    }

    /// Fully in-process state with a random-move bot.
    pub fn in_memory(settings: &Settings) -> Self {
        Self::assemble(
            settings,
            Arc::new(InMemoryQueueRepository::new()),
            Arc::new(InMemoryLeaderboardRepository::new()),
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(RandomMoveSuggester::new()),
        )
    }
}
