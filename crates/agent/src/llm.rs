use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use kitfinder_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for Ollama's `/api/generate` and OpenAI-compatible
/// `/v1/chat/completions` endpoints.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base_url = match (config.provider, config.base_url.as_deref()) {
            (LlmProvider::Disabled, _) => bail!("llm provider is disabled"),
            (_, Some(base_url)) if !base_url.trim().is_empty() => base_url,
            (LlmProvider::OpenAi, _) => OPENAI_DEFAULT_BASE_URL,
            (LlmProvider::Ollama, _) => bail!("llm.base_url is required for the ollama provider"),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::Ollama => self.send_ollama(prompt).await,
            LlmProvider::OpenAi => self.send_openai(prompt).await,
            LlmProvider::Disabled => bail!("llm provider is disabled"),
        }
    }

    async fn send_ollama(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": prompt, "stream": false }))
            .send()
            .await
            .with_context(|| format!("ollama request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("ollama endpoint returned {}", response.status());
        }

        let body: OllamaResponse =
            response.json().await.context("failed to decode ollama response")?;
        Ok(body.response)
    }

    async fn send_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.client.post(&url).json(&json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response =
            request.send().await.with_context(|| format!("chat completion request to {url} failed"))?;
        if !response.status().is_success() {
            bail!("chat completion endpoint returned {}", response.status());
        }

        let body: ChatCompletionResponse =
            response.json().await.context("failed to decode chat completion response")?;
        body.choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion response had no content"))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send(prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(
                        event_name = "llm.completion.succeeded",
                        provider = self.provider.as_str(),
                        attempt,
                        "llm completion succeeded"
                    );
                    return Ok(text.trim().to_string());
                }
                Ok(_) if attempt >= self.max_retries => bail!("llm returned an empty completion"),
                Err(error) if attempt >= self.max_retries => return Err(error),
                outcome => {
                    warn!(
                        event_name = "llm.completion.retry",
                        provider = self.provider.as_str(),
                        attempt,
                        error = ?outcome.err(),
                        "llm completion failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BASE_DELAY * 2u32.saturating_pow(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// `None` when the provider is disabled; callers then answer from templates.
pub fn build_llm_client(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    if config.provider == LlmProvider::Disabled {
        return Ok(None);
    }
    let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(config)?);
    Ok(Some(client))
}
