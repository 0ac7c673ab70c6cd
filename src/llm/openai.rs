//! OpenAI-compatible chat-completion client (Groq, `OpenAI`, local servers)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ChatClient, ChatRequest};
use crate::config::ChatConfig;
use crate::conversation::Message;
use crate::{Error, Result};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`
#[derive(Debug)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
}

impl OpenAiCompatClient {
    /// Create a client for the given base URL
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString, base_url: &Url, timeout: std::time::Duration) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("chat API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: completions_url(base_url)?,
        })
    }

    /// Build from the chat section of the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Self::new(
            SecretString::from(config.api_key.expose_secret().to_string()),
            &config.base_url,
            config.timeout,
        )
    }
}

/// Append `chat/completions` to the base URL, keeping any path prefix
fn completions_url(base_url: &Url) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions")
        .map_err(|e| Error::Config(format!("invalid chat base URL: {e}")))
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let body = CompletionRequest {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("chat API error {status}: {text}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Generation("chat response had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_keeps_prefix() {
        let base = Url::parse("https://api.groq.com/openai/v1").unwrap();
        assert_eq!(
            completions_url(&base).unwrap().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let trailing = Url::parse("http://localhost:8080/v1/").unwrap();
        assert_eq!(
            completions_url(&trailing).unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn request_serializes_roles_lowercase() {
        let messages = [Message::system("sys"), Message::user("hi")];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 1.0,
            max_tokens: 2048,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 2048);
    }
}
