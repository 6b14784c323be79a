use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::error::Result;
use crate::models::Timezone;
use crate::services::dialect::Engine;

type Builder = ConfigBuilder<DefaultState>;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub dialect: DialectConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialectConfig {
    pub engine: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

/// Environment variable to config key
const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("QUERY_ENGINE", "dialect.engine"),
    ("QUERY_TIMEZONE", "dialect.timezone"),
    ("RUST_LOG", "logging.level"),
    ("RUST_LOG_STYLE", "logging.style"),
];

impl Config {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let builder = Self::with_overrides(Self::defaults()?, |key| env::var(key).ok())?;
        builder.build()?.try_deserialize()
    }

    /// Defaults, then the TOML file at `path`, then environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let builder = Self::defaults()?.add_source(File::new(&path, FileFormat::Toml));
        Self::with_overrides(builder, |key| env::var(key).ok())?
            .build()?
            .try_deserialize()
    }

    fn defaults() -> std::result::Result<Builder, ConfigError> {
        config::Config::builder()
            .set_default("dialect.engine", "presto")?
            .set_default("dialect.timezone", "UTC")?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")
    }

    fn with_overrides(
        mut builder: Builder,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Builder, ConfigError> {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(key, value)?;
            }
        }
        Ok(builder)
    }

    pub fn engine(&self) -> Result<Engine> {
        self.dialect.engine.parse()
    }

    pub fn timezone(&self) -> Result<Timezone> {
        self.dialect.timezone.parse()
    }
}
