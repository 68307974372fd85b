use crate::registry::EnvironmentRegistry;
use envdeck_ai::{ChatModel, DeepSeekClient, OpenAiClient};
use envdeck_client::{ProfileApi, ProfileApiClient, ProfileApiConfig};
use envdeck_core::{Config, NoteStore};
use std::sync::Arc;

const DEFAULT_NOTES_PATH: &str = "environment-notes.json";

/// Everything the REST handlers depend on, injected via axum `State`. The
/// profile API and the models sit behind traits so router tests can stub the
/// desktop application and the hosted APIs out.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub profile: Arc<dyn ProfileApi>,
    pub registry: Arc<EnvironmentRegistry>,
    pub notes: Arc<NoteStore>,
    pub models: Vec<Arc<dyn ChatModel>>,
}

impl AppState {
    /// Production wiring: real profile-API client, real model clients.
    pub fn new(config: Config) -> Self {
        let profile = ProfileApiClient::new(ProfileApiConfig {
            port: config.profile_api_port,
            base_url: config.profile_api_url.clone(),
            ..ProfileApiConfig::default()
        });
        let notes_path = config
            .notes_path
            .clone()
            .unwrap_or_else(|| DEFAULT_NOTES_PATH.to_string());
        let models: Vec<Arc<dyn ChatModel>> = vec![
            Arc::new(OpenAiClient::new(
                config.openai_api_key.clone(),
                config.openai_api_url.clone(),
            )),
            Arc::new(DeepSeekClient::new(config.deepseek_api_key.clone())),
        ];
        Self {
            config,
            profile: Arc::new(profile),
            registry: Arc::new(EnvironmentRegistry::new()),
            notes: Arc::new(NoteStore::open(notes_path)),
            models,
        }
    }

    /// Wiring with injected collaborators, used by tests.
    pub fn with_parts(
        config: Config,
        profile: Arc<dyn ProfileApi>,
        notes: Arc<NoteStore>,
        models: Vec<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            config,
            profile,
            registry: Arc::new(EnvironmentRegistry::new()),
            notes,
            models,
        }
    }

    /// Resolve a model by id, falling back to the default when none is asked
    /// for. Returns `None` when the id is unknown.
    pub fn model(&self, requested: Option<&str>) -> Option<Arc<dyn ChatModel>> {
        match requested {
            Some(id) => self.models.iter().find(|m| m.id() == id).cloned(),
            None => self
                .default_model_id()
                .and_then(|id| self.models.iter().find(|m| m.id() == id).cloned()),
        }
    }

    /// First configured model wins; registration order is the preference
    /// order (OpenAI before DeepSeek).
    pub fn default_model_id(&self) -> Option<&'static str> {
        self.models
            .iter()
            .find(|m| m.is_configured())
            .map(|m| m.id())
    }
}
