pub mod bot_service;
pub mod chess_service;
pub mod connection_hub;
pub mod errors;
pub mod leaderboard_service;
pub mod match_service;
pub mod matchmaking_service;
pub mod session_registry;
