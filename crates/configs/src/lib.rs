//! # configs
//!
//! Runtime settings of the mirror, layered as:
//! defaults -> `config/mirror.toml` (optional) -> `MIRROR__*` environment.
//!
//! Example: `MIRROR__BOARD__NAME=v MIRROR__POLL__PAGES=1,2,3`.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/mirror";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub board: BoardSettings,
    pub http: HttpSettings,
    pub poll: PollSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub name: String,
    pub https: bool,
    pub api_host: String,
    pub image_host: String,
    pub thumb_host: String,
    pub web_host: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            name: "g".to_string(),
            https: true,
            api_host: "a.4cdn.org".to_string(),
            image_host: "i.4cdn.org".to_string(),
            thumb_host: "t.4cdn.org".to_string(),
            web_host: "boards.4chan.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("chan-mirror/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: u64,
    pub pages: Vec<u32>,
    /// Poll the catalog in addition to the listed pages.
    pub catalog: bool,
    pub request_deadline_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            pages: vec![1],
            catalog: false,
            request_deadline_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, then the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "ignoring unreadable .env file");
            }
        }
        let raw = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false))
            .add_source(environment())
            .build()?;
        Self::validated(raw.try_deserialize()?)
    }

    /// Builds settings from a TOML document over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let raw = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::validated(raw.try_deserialize()?)
    }

    fn validated(settings: Self) -> Result<Self, ConfigError> {
        if settings.board.name.trim().is_empty() {
            return Err(ConfigError::Invalid("board.name must not be empty".into()));
        }
        if settings.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.interval_secs must be positive".into()));
        }
        if settings.poll.pages.is_empty() && !settings.poll.catalog {
            return Err(ConfigError::Invalid("nothing to poll: set poll.pages or poll.catalog".into()));
        }
        Ok(settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("MIRROR")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("poll.pages")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let settings = Settings::from_toml_str("[board]\nname = \"v\"\n").unwrap();
        assert_eq!(settings.board.name, "v");
        assert!(settings.board.https);
        assert_eq!(settings.board.api_host, "a.4cdn.org");
        assert_eq!(settings.http.timeout_secs, 10);
        assert_eq!(settings.poll.pages, vec![1]);
        assert!(!settings.log.json);
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            [board]
            name = "tv"
            https = false

            [poll]
            interval_secs = 5
            pages = [1, 2, 3]
            catalog = true
        "#;
        let settings = Settings::from_toml_str(toml).unwrap();
        assert!(!settings.board.https);
        assert_eq!(settings.poll.interval_secs, 5);
        assert_eq!(settings.poll.pages, vec![1, 2, 3]);
        assert!(settings.poll.catalog);
    }

    #[test]
    fn empty_board_name_is_rejected() {
        let err = Settings::from_toml_str("[board]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn nothing_to_poll_is_rejected() {
        let err = Settings::from_toml_str("[poll]\npages = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
