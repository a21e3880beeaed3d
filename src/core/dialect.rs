//! Target SQL dialects and the lookup table of their differences.
//!
//! Everything dialect-specific in the exporter goes through [`DialectProfile`]:
//! identifier quoting, autoincrement spelling and the foreign key cascade clause.

use crate::core::validation::is_reserved_keyword;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlDialect {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
    #[serde(rename = "SQL Server")]
    SqlServer,
}

/// Per-dialect spelling rules
#[derive(Debug)]
pub struct DialectProfile {
    pub quote_open: char,
    pub quote_close: char,
    /// `None` when the engine has no practical limit
    pub max_identifier_length: Option<usize>,
    /// Rendering of the dialect-neutral `SERIAL` type
    pub serial: &'static str,
    /// Rendering of the dialect-neutral `BIGSERIAL` type
    pub big_serial: &'static str,
    /// Type and trailing clause for a `SERIAL` column that is the table's
    /// only primary key, as in `<type> PRIMARY KEY <clause>`
    pub serial_key: Option<(&'static str, &'static str)>,
    /// Appended to every foreign key clause
    pub foreign_key_suffix: Option<&'static str>,
}

static MYSQL: DialectProfile = DialectProfile {
    quote_open: '`',
    quote_close: '`',
    max_identifier_length: Some(64),
    serial: "INT AUTO_INCREMENT",
    big_serial: "BIGINT AUTO_INCREMENT",
    serial_key: None,
    foreign_key_suffix: Some("ON DELETE CASCADE"),
};

static POSTGRESQL: DialectProfile = DialectProfile {
    quote_open: '"',
    quote_close: '"',
    max_identifier_length: Some(63),
    serial: "SERIAL",
    big_serial: "BIGSERIAL",
    serial_key: None,
    foreign_key_suffix: None,
};

static SQLITE: DialectProfile = DialectProfile {
    quote_open: '"',
    quote_close: '"',
    max_identifier_length: None,
    // AUTOINCREMENT only attaches to INTEGER PRIMARY KEY, any other
    // declared type name is stored as written
    serial: "SERIAL",
    big_serial: "BIGSERIAL",
    serial_key: Some(("INTEGER", "AUTOINCREMENT")),
    foreign_key_suffix: None,
};

static SQL_SERVER: DialectProfile = DialectProfile {
    quote_open: '[',
    quote_close: ']',
    max_identifier_length: Some(128),
    serial: "INT IDENTITY(1,1)",
    big_serial: "BIGINT IDENTITY(1,1)",
    serial_key: None,
    foreign_key_suffix: None,
};

/// Dialect-neutral autoincrement type tokens
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialKind {
    Serial,
    BigSerial,
}

impl SerialKind {
    /// Recognize a canonical serial type token (case-insensitive)
    pub fn from_type(data_type: &str) -> Option<Self> {
        match data_type.trim().to_ascii_uppercase().as_str() {
            "SERIAL" => Some(SerialKind::Serial),
            "BIGSERIAL" => Some(SerialKind::BigSerial),
            _ => None,
        }
    }

    pub fn canonical(self) -> &'static str {
        match self {
            SerialKind::Serial => "SERIAL",
            SerialKind::BigSerial => "BIGSERIAL",
        }
    }
}

impl SqlDialect {
    pub const ALL: [SqlDialect; 4] = [
        SqlDialect::MySQL,
        SqlDialect::PostgreSQL,
        SqlDialect::SQLite,
        SqlDialect::SqlServer,
    ];

    pub fn profile(self) -> &'static DialectProfile {
        match self {
            SqlDialect::MySQL => &MYSQL,
            SqlDialect::PostgreSQL => &POSTGRESQL,
            SqlDialect::SQLite => &SQLITE,
            SqlDialect::SqlServer => &SQL_SERVER,
        }
    }

    /// Quote `name` with the dialect's delimiters when it is not a plain
    /// identifier or collides with a reserved keyword
    pub fn quote_identifier(self, name: &str) -> String {
        if needs_quoting(name) {
            let profile = self.profile();
            let escaped = if profile.quote_open == profile.quote_close {
                let q = profile.quote_close.to_string();
                name.replace(&q, &q.repeat(2))
            } else {
                name.replace(']', "]]")
            };
            format!("{}{}{}", profile.quote_open, escaped, profile.quote_close)
        } else {
            name.to_string()
        }
    }

    /// Render a field type, translating the dialect-neutral serial tokens
    pub fn render_type(self, data_type: &str) -> String {
        match SerialKind::from_type(data_type) {
            Some(SerialKind::Serial) => self.profile().serial.to_string(),
            Some(SerialKind::BigSerial) => self.profile().big_serial.to_string(),
            None => data_type.trim().to_string(),
        }
    }
}

fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    !plain || is_reserved_keyword(name)
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::MySQL => write!(f, "MySQL"),
            SqlDialect::PostgreSQL => write!(f, "PostgreSQL"),
            SqlDialect::SQLite => write!(f, "SQLite"),
            SqlDialect::SqlServer => write!(f, "SQL Server"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SQL dialect '{0}'")]
pub struct UnknownDialect(pub String);

impl FromStr for SqlDialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "sqlite" | "sqlite3" => Ok(SqlDialect::SQLite),
            "sqlserver" | "mssql" | "tsql" => Ok(SqlDialect::SqlServer),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
