// Runtime configuration read from the environment (and `.env` via dotenv)

use std::str::FromStr;

use thiserror::Error;

use crate::auth::password::DEFAULT_SALT_ROUNDS;
use crate::auth::token::DEFAULT_TOKEN_TTL_SECONDS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory store
    pub database_url: Option<String>,
    pub jwt_signature_key: String,
    pub jwt_ttl_seconds: i64,
    pub bcrypt_rounds: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_signature_key = get("JWT_SIGNATURE_KEY").ok_or(ConfigError::Missing("JWT_SIGNATURE_KEY"))?;

        let bcrypt_rounds = parse_or("BCRYPT_ROUNDS", get("BCRYPT_ROUNDS"), DEFAULT_SALT_ROUNDS)?;
        if !(4..=31).contains(&bcrypt_rounds) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_ROUNDS",
                value: bcrypt_rounds.to_string(),
            });
        }

        let jwt_ttl_seconds = parse_or("JWT_TTL_SECONDS", get("JWT_TTL_SECONDS"), DEFAULT_TOKEN_TTL_SECONDS)?;
        if jwt_ttl_seconds <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_SECONDS",
                value: jwt_ttl_seconds.to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 8000)?,
            database_url: get("DATABASE_URL"),
            jwt_signature_key,
            jwt_ttl_seconds,
            bcrypt_rounds,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
