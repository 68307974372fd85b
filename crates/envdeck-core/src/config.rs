use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default port for the console's own REST listener.
pub const DEFAULT_LISTEN_PORT: u16 = 3002;

/// Default local API port of the profile-manager desktop application.
pub const DEFAULT_PROFILE_API_PORT: u16 = 50325;

/// Service configuration, loaded from an optional JSON file with
/// environment-variable fallbacks. A missing file is not an error; every
/// field has a usable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Port the REST service listens on.
    pub port: u16,

    /// Port of the profile-manager local API.
    pub profile_api_port: u16,

    /// Explicit profile-manager base URL. When set, probing still runs but
    /// this URL is tried first.
    pub profile_api_url: Option<String>,

    /// OpenAI-compatible API key.
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible base URL override.
    pub openai_api_url: Option<String>,

    /// DeepSeek API key.
    pub deepseek_api_key: Option<String>,

    /// Path of the environment-notes JSON file.
    pub notes_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_LISTEN_PORT,
            profile_api_port: DEFAULT_PROFILE_API_PORT,
            profile_api_url: None,
            openai_api_key: None,
            openai_api_url: None,
            deepseek_api_key: None,
            notes_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, then apply environment-variable
    /// fallbacks for any field the file left unset.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let contents = std::fs::read_to_string(p)?;
                let config: Config = serde_json::from_str(&contents)?;
                tracing::info!("Loaded configuration from {}", p.display());
                config
            }
            Some(p) => {
                tracing::info!("Config file {} not found, using defaults", p.display());
                Config::default()
            }
            None => Config::default(),
        };

        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Fill unset fields from the process environment.
    fn apply_env_fallbacks(&mut self) {
        if self.openai_api_key.is_none() {
            self.openai_api_key = non_empty_env("OPENAI_API_KEY");
        }
        if self.openai_api_url.is_none() {
            self.openai_api_url = non_empty_env("OPENAI_API_URL");
        }
        if self.deepseek_api_key.is_none() {
            self.deepseek_api_key = non_empty_env("DEEPSEEK_API_KEY");
        }
        if let Some(port) = non_empty_env("PROFILE_API_PORT").and_then(|v| v.parse().ok()) {
            if self.profile_api_port == DEFAULT_PROFILE_API_PORT {
                self.profile_api_port = port;
            }
        }
        if let Some(port) = non_empty_env("PORT").and_then(|v| v.parse().ok()) {
            if self.port == DEFAULT_LISTEN_PORT {
                self.port = port;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("listen port must be non-zero".into()));
        }
        if self.profile_api_port == 0 {
            return Err(Error::Config("profile API port must be non-zero".into()));
        }
        Ok(())
    }

    /// Whether at least one hosted model is usable.
    pub fn any_model_configured(&self) -> bool {
        self.openai_api_key.is_some() || self.deepseek_api_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
