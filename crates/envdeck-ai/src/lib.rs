// Hosted LLM clients and translation of generated code into browser actions.

mod chat;
mod deepseek;
mod error;
mod openai;
pub mod prompt;

pub use deepseek::{DeepSeekClient, FALLBACK_SNIPPET};
pub use error::{Error, Result};
pub use openai::OpenAiClient;
pub use prompt::{build_context, extract_code_block, plan_action, wrap_script, BrowserAction};

use async_trait::async_trait;

/// A hosted chat model the console can route commands to.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stable identifier used in API payloads ("openai", "deepseek").
    fn id(&self) -> &'static str;

    /// Human-readable name for model listings.
    fn display_name(&self) -> &'static str;

    /// Whether an API key is configured for this model.
    fn is_configured(&self) -> bool;

    /// Generate a reply for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
