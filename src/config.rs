//! Environment-driven configuration for the web binary.
//!
//! | Variable      | Default          |
//! |---------------|------------------|
//! | `HOST`        | `0.0.0.0`        |
//! | `PORT`        | `8080`           |
//! | `DATA_FILE`   | `user_data.json` |
//! | `DATA_BACKUP` | `true`           |
//! | `RP_1ST`..`RP_4TH` | `100/50/30/30` |

use crate::models::RewardTable;
use std::path::PathBuf;

/// A variable was set but could not be parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigError {
    pub var: String,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_file: PathBuf,
    pub backup: bool,
    /// Used when a configure request leaves out rewards.
    pub default_rewards: RewardTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_file: PathBuf::from("user_data.json"),
            backup: true,
            default_rewards: RewardTable::default(),
        }
    }
}

impl AppConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read through `lookup`; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let rewards = defaults.default_rewards;
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            data_file: lookup("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            backup: parse_or(&lookup, "DATA_BACKUP", defaults.backup)?,
            default_rewards: RewardTable {
                first: parse_or(&lookup, "RP_1ST", rewards.first)?,
                second: parse_or(&lookup, "RP_2ND", rewards.second)?,
                third: parse_or(&lookup, "RP_3RD", rewards.third)?,
                fourth: parse_or(&lookup, "RP_4TH", rewards.fourth)?,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            var: var.to_string(),
            value,
        }),
    }
}
