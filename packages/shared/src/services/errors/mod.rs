pub mod chess_service_errors;
pub mod leaderboard_service_errors;
pub mod match_service_errors;
pub mod matchmaking_service_errors;
pub mod session_registry_errors;
pub mod transport_errors;
