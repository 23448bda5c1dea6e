pub mod game_repository_errors;
pub mod leaderboard_repository_errors;
pub mod queue_repository_errors;
