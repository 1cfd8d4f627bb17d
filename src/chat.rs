use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{is_retryable, with_retry_if, RetryConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// OpenAI-compatible chat completion client (DeepSeek by default).
///
/// Shared by batch translation and comment summarization.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
    model: String,
    retry: RetryConfig,
}

impl ChatClient {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: config.deepseek_api_key.clone(),
            url: format!(
                "{}/chat/completions",
                config.deepseek_base_url.trim_end_matches('/')
            ),
            model: config.deepseek_model.clone(),
            retry: RetryConfig::chat_completion(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run one completion and return the trimmed content of the first choice.
    ///
    /// 408/409/429/5xx and transport errors are retried with linear backoff.
    pub async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> PipelineResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::ProviderError("DEEPSEEK_API_KEY not set".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        let chat_response: ChatResponse = with_retry_if(
            &self.retry,
            "Chat completion",
            || async {
                let response = self
                    .client
                    .post(&self.url)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<ChatResponse, PipelineError>(response.json().await?)
            },
            is_retryable,
        )
        .await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| {
                PipelineError::ProviderError("chat response contained no choices".to_string())
            })
    }
}
