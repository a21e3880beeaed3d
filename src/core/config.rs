//! Runtime configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.

use crate::core::dialect::SqlDialect;
use crate::core::export::ExportOptions;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Target dialect when none is given explicitly (`ERDSYNC_DIALECT`)
    pub dialect: SqlDialect,

    /// Undo depth of an editor session (`ERDSYNC_HISTORY_LIMIT`)
    pub history_limit: usize,

    /// Emit `-- Position:` comments in exported SQL (`ERDSYNC_INCLUDE_POSITIONS`)
    pub include_positions: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Values that do not parse are logged and
    /// replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dialect = match lookup("ERDSYNC_DIALECT") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring ERDSYNC_DIALECT: {}", e);
                SqlDialect::default()
            }),
            None => SqlDialect::default(),
        };

        let history_limit = match lookup("ERDSYNC_HISTORY_LIMIT") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    tracing::warn!("Ignoring ERDSYNC_HISTORY_LIMIT '{}': expected a positive integer", value);
                    DEFAULT_HISTORY_LIMIT
                }
            },
            None => DEFAULT_HISTORY_LIMIT,
        };

        let include_positions = match lookup("ERDSYNC_INCLUDE_POSITIONS") {
            Some(value) => parse_flag(&value).unwrap_or_else(|| {
                tracing::warn!("Ignoring ERDSYNC_INCLUDE_POSITIONS '{}': expected true or false", value);
                false
            }),
            None => false,
        };

        Self {
            dialect,
            history_limit,
            include_positions,
        }
    }

    /// Export options for the configured dialect
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_positions: self.include_positions,
            ..ExportOptions::for_dialect(self.dialect)
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
