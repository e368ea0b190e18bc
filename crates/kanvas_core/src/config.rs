use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composer::MatchPolicy;
use crate::error::{ChatError, Result};

pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub cache_dir: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let cache_dir = std::env::var_os("TRANSFORMERS_CACHE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp/.cache"));
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir,
        }
    }
}

impl ModelSettings {
    /// `<cache_dir>/<model short name>`, e.g. `/tmp/.cache/all-MiniLM-L6-v2`.
    pub fn artifact_dir(&self) -> PathBuf {
        let short = self.name.rsplit('/').next().unwrap_or(&self.name);
        self.cache_dir.join(short)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,
    pub model: ModelSettings,
    pub policy: MatchPolicy,
    pub faq_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Kanvas Chatbot API".to_string(),
            app_version: "1.0.0".to_string(),
            log_level: "info".to_string(),
            model: ModelSettings::default(),
            policy: MatchPolicy::default(),
            faq_path: None,
        }
    }
}

impl Settings {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ChatError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml(&contents)
    }

    /// An explicit path must exist. Without one, the user config file is
    /// read when present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.policy;
        if !(-1.0..=1.0).contains(&p.threshold) {
            return Err(ChatError::Config(format!(
                "policy.threshold must be within [-1, 1], got {}",
                p.threshold
            )));
        }
        if p.high_confidence < p.threshold {
            return Err(ChatError::Config(format!(
                "policy.high_confidence ({}) is below policy.threshold ({})",
                p.high_confidence, p.threshold
            )));
        }
        if p.greeting_tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ChatError::Config(
                "policy.greeting_tokens must not contain blank tokens".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kanvas").join(CONFIG_FILE))
}
