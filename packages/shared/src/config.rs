use std::str::FromStr;
use std::time::Duration;

use crate::services::{leaderboard_service::PointsTable, matchmaking_service::MatchmakingSettings};

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub redis_url: Option<String>,
    pub games_table: Option<String>,
    pub game_moves_table: String,
    pub matchmaking_timeout: Duration,
    pub matchmaking_poll_interval: Duration,
    pub match_result_ttl: Duration,
    pub bot_move_delay: Duration,
    pub stockfish_path: String,
    pub stockfish_depth: u32,
    pub stockfish_timeout: Duration,
    pub points: PointsTable,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: "0.0.0.0:8000".to_string(),
            redis_url: None,
            games_table: None,
            game_moves_table: "game_moves".to_string(),
            matchmaking_timeout: Duration::from_secs(10),
            matchmaking_poll_interval: Duration::from_millis(500),
            match_result_ttl: Duration::from_secs(30),
            bot_move_delay: Duration::from_millis(500),
            stockfish_path: "/usr/local/bin/stockfish".to_string(),
            stockfish_depth: 10,
            stockfish_timeout: Duration::from_millis(5000),
            points: PointsTable::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Settings {
            bind_addr: text("BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: text("REDIS_URL"),
            games_table: text("GAMES_TABLE"),
            game_moves_table: text("GAME_MOVES_TABLE").unwrap_or(defaults.game_moves_table),
            matchmaking_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MATCHMAKING_TIMEOUT_SECONDS",
                defaults.matchmaking_timeout.as_secs(),
            )?),
            matchmaking_poll_interval: Duration::from_millis(nonzero_or(
                &lookup,
                "MATCHMAKING_POLL_INTERVAL_MS",
                defaults.matchmaking_poll_interval.as_millis() as u64,
            )?),
            match_result_ttl: Duration::from_secs(parse_or(
                &lookup,
                "MATCH_RESULT_TTL_SECONDS",
                defaults.match_result_ttl.as_secs(),
            )?),
            bot_move_delay: Duration::from_millis(parse_or(
                &lookup,
                "BOT_MOVE_DELAY_MS",
                defaults.bot_move_delay.as_millis() as u64,
            )?),
            stockfish_path: text("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            stockfish_depth: parse_or(&lookup, "STOCKFISH_DEPTH", defaults.stockfish_depth)?,
            stockfish_timeout: Duration::from_millis(parse_or(
                &lookup,
                "STOCKFISH_TIMEOUT_MS",
                defaults.stockfish_timeout.as_millis() as u64,
            )?),
            points: PointsTable {
                win: parse_or(&lookup, "WIN_POINTS", defaults.points.win)?,
                draw: parse_or(&lookup, "DRAW_POINTS", defaults.points.draw)?,
                loss: parse_or(&lookup, "LOSS_POINTS", defaults.points.loss)?,
            },
        })
    }

    pub fn matchmaking(&self) -> MatchmakingSettings {
        MatchmakingSettings {
            timeout: self.matchmaking_timeout,
            poll_interval: self.matchmaking_poll_interval,
            result_ttl: self.match_result_ttl,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

/// Like `parse_or`, but zero is rejected.
fn nonzero_or<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: "0".to_string(),
        }),
        value => Ok(value),
    }
}
