use thiserror::Error;

use crate::chat::DEFAULT_MAX_TURNS;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a production Postgres instance")]
    MissingDatabaseUrl,
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_turns: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        let max_turns = match lookup("SKIN_TRACKER_MAX_TURNS") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(turns) if turns > 0 => turns,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "SKIN_TRACKER_MAX_TURNS",
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_TURNS,
        };

        Ok(Self {
            database_url,
            max_turns,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}
