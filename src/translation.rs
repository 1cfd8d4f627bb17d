//! Translation backends.
//!
//! [`MyMemoryTranslator`] translates item by item and never fails a batch: an
//! item that cannot be translated comes back unchanged. [`ChatBatchTranslator`]
//! sends a whole batch as one JSON array through the chat client and falls
//! back to MyMemory when the reply is unusable or has the wrong length.

use crate::chat::{ChatClient, Message};
use crate::config::{Config, TranslateProvider};
use crate::error::{PipelineError, PipelineResult};
use crate::i18n::{is_chinese_family, looks_chinese};
use crate::retry::{is_retryable, with_retry_if, RetryConfig};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-flight requests per `translate_many` call on the per-item backend
const ITEM_CONCURRENCY: usize = 4;

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Translate a single text. Errors are returned to the caller.
    async fn translate_one(&self, text: &str, source: &str, target: &str) -> PipelineResult<String>;

    /// Translate many texts. The output always has the same length and order
    /// as `texts`; untranslatable items come back as their original text.
    async fn translate_many(&self, texts: &[String], source: &str, target: &str) -> Vec<String>;
}

/// Returns the text itself when no translation round trip is needed:
/// empty text, Chinese to Chinese, or "auto" source text that is already
/// Chinese with a Chinese target.
pub fn passthrough(text: &str, source: &str, target: &str) -> Option<String> {
    if text.trim().is_empty() {
        return Some(text.to_string());
    }
    if is_chinese_family(target) {
        if is_chinese_family(source) {
            return Some(text.to_string());
        }
        if source.eq_ignore_ascii_case("auto") && looks_chinese(text) {
            return Some(text.to_string());
        }
    }
    None
}

// ==================== MyMemory (per item) ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: Option<MyMemoryData>,
    response_status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

impl MyMemoryResponse {
    /// MyMemory reports quota and query errors in-band, as a number or a string.
    fn status(&self) -> Option<u64> {
        match &self.response_status {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MyMemoryTranslator {
    client: reqwest::Client,
    url: String,
    email: Option<String>,
    retry: RetryConfig,
}

impl MyMemoryTranslator {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.mymemory_url.clone(),
            email: config.mymemory_email.clone(),
            retry: RetryConfig::upstream_get(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> PipelineResult<String> {
        let langpair = format!("{}|{}", source, target);
        let mut params = vec![("q", text), ("langpair", langpair.as_str())];
        if let Some(email) = &self.email {
            params.push(("de", email.as_str()));
        }

        let body: MyMemoryResponse = with_retry_if(
            &self.retry,
            "MyMemory translation",
            || async {
                let response = self
                    .client
                    .get(&self.url)
                    .query(&params)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<MyMemoryResponse, PipelineError>(response.json().await?)
            },
            is_retryable,
        )
        .await?;

        if let Some(status) = body.status().filter(|s| *s != 200) {
            return Err(PipelineError::ProviderError(format!(
                "MyMemory responded with status {}",
                status
            )));
        }

        Ok(body
            .response_data
            .and_then(|d| d.translated_text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| text.to_string()))
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    fn name(&self) -> &'static str {
        "mymemory"
    }

    async fn translate_one(&self, text: &str, source: &str, target: &str) -> PipelineResult<String> {
        if let Some(same) = passthrough(text, source, target) {
            return Ok(same);
        }
        self.request(text, source, target).await
    }

    async fn translate_many(&self, texts: &[String], source: &str, target: &str) -> Vec<String> {
        stream::iter(texts.iter().cloned())
            .map(|text: String| async move {
                match self.translate_one(&text, source, target).await {
                    Ok(translated) => translated,
                    Err(e) => {
                        warn!("Item translation failed, keeping original: {}", e);
                        text
                    }
                }
            })
            .buffered(ITEM_CONCURRENCY)
            .collect()
            .await
    }
}

// ==================== Chat batch ====================

fn build_batch_system_prompt(source: &str, target: &str, count: usize) -> String {
    let source = if source.eq_ignore_ascii_case("auto") {
        "the detected source language"
    } else {
        source
    };
    format!(
        "You are a translation engine. Translate every string in the JSON array \
         from {source} to {target}.\n\
         Reply with ONLY a JSON array of {count} strings: one translation per input, \
         in the same order. Do not merge, split, drop or explain entries."
    )
}

/// Locate the first balanced `[...]` span, ignoring brackets inside JSON strings.
fn find_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the model reply into exactly `expected` strings.
pub fn parse_batch_reply(reply: &str, expected: usize) -> PipelineResult<Vec<String>> {
    let span = find_json_array(reply).ok_or_else(|| {
        PipelineError::ProviderError("batch reply contained no JSON array".to_string())
    })?;
    let values: Vec<serde_json::Value> = serde_json::from_str(span)
        .map_err(|e| PipelineError::ProviderError(format!("batch reply is not valid JSON: {}", e)))?;

    if values.len() != expected {
        return Err(PipelineError::LengthMismatch {
            expected,
            actual: values.len(),
        });
    }

    Ok(values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

pub struct ChatBatchTranslator {
    chat: ChatClient,
    fallback: MyMemoryTranslator,
}

impl ChatBatchTranslator {
    pub fn new(chat: ChatClient, fallback: MyMemoryTranslator) -> Self {
        Self { chat, fallback }
    }

    /// One chat round trip for the whole batch. Items that need no
    /// translation are never sent and keep their position.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> PipelineResult<Vec<String>> {
        let pending: Vec<usize> = (0..texts.len())
            .filter(|&i| passthrough(&texts[i], source, target).is_none())
            .collect();
        if pending.is_empty() {
            return Ok(texts.to_vec());
        }

        let inputs: Vec<&str> = pending.iter().map(|&i| texts[i].as_str()).collect();
        let payload = serde_json::to_string(&inputs)
            .map_err(|e| PipelineError::ProviderError(format!("cannot encode batch: {}", e)))?;
        let input_chars: usize = inputs.iter().map(|t| t.chars().count()).sum();
        let max_tokens = (input_chars * 3 + 256).clamp(512, 8000) as u32;

        let reply = self
            .chat
            .complete(
                &[
                    Message::system(build_batch_system_prompt(source, target, inputs.len())),
                    Message::user(payload),
                ],
                0.1,
                max_tokens,
            )
            .await?;
        let translated = parse_batch_reply(&reply, inputs.len())?;

        let mut output = texts.to_vec();
        for (index, translation) in pending.into_iter().zip(translated) {
            if !translation.trim().is_empty() {
                output[index] = translation;
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl Translator for ChatBatchTranslator {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn translate_one(&self, text: &str, source: &str, target: &str) -> PipelineResult<String> {
        if let Some(same) = passthrough(text, source, target) {
            return Ok(same);
        }
        match self.translate_batch(&[text.to_string()], source, target).await {
            Ok(mut out) => Ok(out.remove(0)),
            Err(e) => {
                debug!("Chat translation failed ({}), using {}", e, self.fallback.name());
                self.fallback.translate_one(text, source, target).await
            }
        }
    }

    async fn translate_many(&self, texts: &[String], source: &str, target: &str) -> Vec<String> {
        match self.translate_batch(texts, source, target).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(
                    "Batch translation of {} items failed ({}), falling back to {}",
                    texts.len(),
                    e,
                    self.fallback.name()
                );
                self.fallback.translate_many(texts, source, target).await
            }
        }
    }
}

/// Build the configured translator. The chat provider requires an API key;
/// without one the per-item backend is used directly.
pub fn build_translator(config: &Config, client: reqwest::Client) -> Arc<dyn Translator> {
    let mymemory = MyMemoryTranslator::new(config, client.clone());
    match config.translate_provider {
        TranslateProvider::DeepSeek if config.deepseek_api_key.is_some() => {
            info!("Using chat batch translation with MyMemory fallback");
            Arc::new(ChatBatchTranslator::new(ChatClient::new(config, client), mymemory))
        }
        TranslateProvider::DeepSeek => {
            warn!("TRANSLATE_PROVIDER=deepseek but DEEPSEEK_API_KEY is not set, using MyMemory");
            Arc::new(mymemory)
        }
        TranslateProvider::MyMemory => Arc::new(mymemory),
    }
}
