//! User configuration at `<home>/.docsmith/config.yaml`.
//!
//! Every field has a default, so a missing file (or a partial one) is valid.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::{docsmith_root, ensure_dir, write_atomic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub reconcile: ReconcileConfig,
    pub author: AuthorConfig,
    pub license: LicenseConfig,
    pub daemon: DaemonConfig,
}

/// Settings for the text-generation backend and its retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenAI-compatible chat-completions endpoint.
    pub api_url: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub scaffold_model: String,
    pub update_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Attempts per reconciliation cycle.
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    /// Base delay between attempts; doubles after each failure.
    pub backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://aipipe.org/openrouter/v1/chat/completions".to_string(),
            api_key_env: "AIPIPE_API_KEY".to_string(),
            scaffold_model: "openai/gpt-4o-mini".to_string(),
            update_model: "openai/gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            max_attempts: 3,
            attempt_timeout_secs: 120,
            backoff_ms: 1000,
        }
    }
}

/// Which checklist the Features section is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistPolicy {
    /// No checklist coverage check.
    #[default]
    Off,
    /// The checklist the project was scaffolded against.
    Original,
    /// The most recently supplied checklist.
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub checklist_policy: ChecklistPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "Student".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub name: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            name: "MIT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Environment variable holding the shared request secret. Unset or empty
    /// disables authentication.
    pub shared_secret_env: Option<String>,
}

impl DaemonConfig {
    /// Resolve the configured secret from the environment.
    pub fn shared_secret(&self) -> Option<String> {
        let var = self.shared_secret_env.as_deref()?;
        std::env::var(var).ok().filter(|s| !s.is_empty())
    }
}

/// `<home>/.docsmith/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    docsmith_root(home).join("config.yaml")
}

/// Load the config, falling back to defaults when the file does not exist.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&dirs::home_dir().ok_or(ConfigError::HomeNotFound)?)
}

/// Write the config atomically. Returns the path written.
pub fn save_at(home: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    let yaml = serde_yaml::to_string(config)?;
    ensure_dir(&docsmith_root(home))?;
    write_atomic(&path, yaml.as_bytes())?;
    Ok(path)
}
