pub mod game;
pub mod health;
pub mod leaderboard;
pub mod websocket;
