pub mod events;
pub mod game_record;
pub mod game_session;
pub mod leaderboard;
pub mod matchmaking;
pub mod outcome;
