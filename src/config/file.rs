//! Optional TOML configuration file
//!
//! Every section is optional. Values here are overridden by environment
//! variables of the same meaning.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [generation]
//! endpoint = "http://localhost:5000"
//! timeout_secs = 30
//!
//! [judge]
//! debounce_ms = 750
//!
//! [cast.character1]
//! name = "Sam"
//! personality = "Curious, talks too fast"
//! hobbies = "chess, hiking"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conversation::CharacterRoster;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default)]
    pub judge: JudgeSection,

    /// Characters to seed into an empty character store
    #[serde(default)]
    pub cast: Option<CharacterRoster>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "generation.timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(cast) = &self.cast {
            for character in cast.character1.iter().chain(cast.character2.iter()) {
                character
                    .validate()
                    .map_err(|e| ConfigError::Validation(format!("cast: {e}")))?;
            }
            if let (Some(c1), Some(c2)) = (&cast.character1, &cast.character2) {
                if c1.name.trim() == c2.name.trim() {
                    return Err(ConfigError::Validation(format!(
                        "cast: both characters are named {}",
                        c1.name.trim()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    /// Base URL of the generation service
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgeSection {
    /// Quiet period after the last judge edit before regenerating
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
