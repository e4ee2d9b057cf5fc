//! Application configuration

pub mod file;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::conversation::CharacterRoster;
use crate::core::{SessionSettings, DEFAULT_DEBOUNCE};

pub use file::{ConfigError, ConfigFile};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub generation_url: String,
    pub generation_timeout_secs: u64,
    pub judge_debounce_ms: u64,
    pub data_dir: PathBuf,
    /// Roster to seed when the character store is empty
    pub cast: Option<CharacterRoster>,
}

impl Config {
    /// Environment first, then the file named by `DATING_SIM_CONFIG`, then defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match env::var("DATING_SIM_CONFIG") {
            Ok(path) => ConfigFile::from_file(&PathBuf::from(path))?,
            Err(_) => ConfigFile::default(),
        };
        Ok(Self::from_env_with_file(file))
    }

    /// Resolve every setting against an already-parsed config file
    pub fn from_env_with_file(file: ConfigFile) -> Self {
        Self {
            host: env::var("HOST")
                .ok()
                .or(file.server.host)
                .unwrap_or_else(|| "127.0.0.1".into()),
            port: env_parse("PORT").or(file.server.port).unwrap_or(3000),
            generation_url: env::var("GENERATION_URL")
                .ok()
                .or(file.generation.endpoint)
                .unwrap_or_else(|| "http://localhost:5000".into()),
            generation_timeout_secs: env_parse("GENERATION_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .or(file.generation.timeout_secs)
                .unwrap_or(60),
            judge_debounce_ms: env_parse("JUDGE_DEBOUNCE_MS")
                .or(file.judge.debounce_ms)
                .unwrap_or(DEFAULT_DEBOUNCE.as_millis() as u64),
            data_dir: env::var("DATING_SIM_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            cast: file.cast,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            debounce: Duration::from_millis(self.judge_debounce_ms),
            generation_timeout: self.generation_timeout(),
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
