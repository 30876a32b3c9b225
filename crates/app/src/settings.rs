//! Application settings.
//!
//! Read from an optional TOML file (`settings.toml` by default) and from
//! `MONEYTRACK_*` environment variables, which take precedence. Nested keys
//! use `__`, e.g. `MONEYTRACK_APP__LEVEL=debug`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("moneytrack.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default)]
    pub database: Database,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("MONEYTRACK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_urls() {
        assert_eq!(Database::Memory.url(), "sqlite::memory:");
        assert_eq!(
            Database::Sqlite("data/money.db".to_string()).url(),
            "sqlite:data/money.db?mode=rwc"
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::new("does-not-exist").unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::default());
    }
}
