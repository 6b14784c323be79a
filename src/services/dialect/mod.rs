// SQL dialect layer for the supported query engines
pub mod mysql;
pub mod presto;
pub mod sql_dialect;
pub mod time_part;

pub use mysql::MySqlDialect;
pub use presto::PrestoDialect;
pub use sql_dialect::SqlDialect;
pub use time_part::{PartPrimitives, TimePart};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Query engine enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Presto,
    Mysql,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Presto => "presto",
            Engine::Mysql => "mysql",
        }
    }

    /// Dialect instance for this engine
    pub fn dialect(&self) -> Box<dyn SqlDialect> {
        match self {
            Engine::Presto => Box::new(PrestoDialect::new()),
            Engine::Mysql => Box::new(MySqlDialect::new()),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "presto" => Ok(Engine::Presto),
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            _ => Err(QueryError::UnknownEngine(s.to_string())),
        }
    }
}
