use crate::chat::completion;
use crate::{ChatModel, Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;

/// Client-side cap; the hosted API throttles hard beyond this.
const MAX_REQUESTS_PER_MINUTE: usize = 10;
const WINDOW: Duration = Duration::from_secs(60);

/// OpenAI-compatible chat client with a sliding-window rate limiter.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    request_times: Mutex<VecDeque<Instant>>,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, api_base: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("No OpenAI API key configured; the openai model is disabled");
        }
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key,
            api_base,
            request_times: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a request slot is free within the per-minute window.
    async fn acquire_slot(&self) {
        loop {
            let wait = {
                let mut times = self.request_times.lock().await;
                let now = Instant::now();
                while times
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= WINDOW)
                {
                    times.pop_front();
                }
                if times.len() < MAX_REQUESTS_PER_MINUTE {
                    times.push_back(now);
                    None
                } else {
                    times.front().map(|oldest| WINDOW - now.duration_since(*oldest))
                }
            };
            match wait {
                None => return,
                Some(delay) => {
                    tracing::info!("OpenAI rate limit reached, waiting {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI GPT-4"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NotConfigured("openai".into()));
        };
        self.acquire_slot().await;
        completion(
            &self.http,
            &self.api_base,
            api_key,
            MODEL,
            prompt,
            TEMPERATURE,
            MAX_TOKENS,
        )
        .await
    }
}
