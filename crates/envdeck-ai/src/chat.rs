use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// System prompt shared by both providers: the reply must be runnable
/// browser-side JavaScript in a single code fence, no prose.
pub(crate) const SYSTEM_PROMPT: &str = "You are a browser automation assistant. \
Reply with precise, runnable JavaScript that performs the requested task in a \
page context, inside a single ```js code block. Return only the code, no \
explanation.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// One `/chat/completions` round trip against an OpenAI-compatible endpoint.
pub(crate) async fn completion(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String> {
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    let request = ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            Message {
                role: "user",
                content: prompt,
            },
        ],
        max_tokens,
        temperature,
    };

    tracing::debug!("Calling {} (model: {})", url, model);
    let response = http
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);
        tracing::error!("Chat API error {}: {}", status, message);
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ChatResponse = response.json().await?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(Error::EmptyResponse)?;

    tracing::debug!("Chat API replied with {} chars", text.len());
    Ok(text)
}
