//! OpenAI-compatible chat completions client

use super::{CompletionProvider, SummaryOutput, SummaryProvider};
use crate::config::{LlmConfig, SummaryConfig};
use crate::error::{ContextError, Result};
use crate::store::{Message, Summary};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, error, warn};

const COMPLETION_SYSTEM_PREAMBLE: &str = "You suggest how the user could continue typing their next chat message. \
Reply with the completed message only, written in the user's own style.";

const SUMMARY_SYSTEM_PROMPT: &str = "You maintain a running summary of a chat conversation. \
Answer with a JSON object only.";

const SUMMARY_TEMPERATURE: f32 = 0.3;

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    summary: SummaryConfig,
    api_key: Option<SecretString>,
}

impl LlmClient {
    /// Create a client, reading the API key from the variable named by `api_key_env`
    pub fn new(config: LlmConfig, summary: SummaryConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::new);

        if api_key.is_none() {
            warn!(
                "{} is not set, requests to {} are sent without authorization",
                config.api_key_env, config.endpoint
            );
        }

        Self::with_api_key(config, summary, api_key)
    }

    pub fn with_api_key(
        config: LlmConfig,
        summary: SummaryConfig,
        api_key: Option<SecretString>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ContextError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            summary,
            api_key,
        })
    }

    /// Send a chat request, retrying failed attempts with exponential backoff
    async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt > self.config.max_retries {
                        error!("Chat completion failed after {} attempts: {}", attempt, e);
                        return Err(e);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Chat completion attempt {} failed: {}, retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let mut req = self.http.post(&self.config.endpoint).json(request);

        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ContextError::Timeout(e.to_string())
            } else {
                ContextError::Provider(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ContextError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ContextError::Provider(format!("Failed to parse response: {}", e)))
    }

    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10) as u32;
        self.config.retry_backoff() * 2u32.pow(exponent)
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            top_p: Some(self.config.top_p),
            frequency_penalty: Some(self.config.frequency_penalty),
            presence_penalty: Some(self.config.presence_penalty),
            n: None,
        }
    }

    /// Summarization prompt over the latest window of messages
    fn build_summary_prompt(&self, messages: &[Message], existing: &Summary) -> String {
        let window = self.summary.prompt_message_window.max(1);
        let start = messages.len().saturating_sub(window);

        let mut prompt = String::from(
            "Analyze the conversation below and produce a concise summary covering its topics and key facts.\n\n",
        );

        if !existing.prompt.is_empty() {
            let _ = writeln!(prompt, "Existing summary:\n{}\n", existing.prompt);
            prompt.push_str("Update the existing summary with the new messages.\n\n");
        }

        prompt.push_str("Conversation:\n");
        for message in &messages[start..] {
            let _ = writeln!(prompt, "[{}]: {}", message.sender_id, message.content);
        }

        let _ = write!(
            prompt,
            "\nRespond with a JSON object of the form \
             {{\"prompt\": \"<summary usable as background for later replies>\", \
             \"key_info\": [<at most {} objects with the key facts>]}}.",
            self.summary.key_info_count
        );

        prompt
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(
        &self,
        context: &str,
        input: &str,
        max_suggestions: usize,
    ) -> Result<Vec<String>> {
        if max_suggestions == 0 {
            return Ok(Vec::new());
        }

        let mut request = self.request(vec![
            ChatMessage::new("system", format!("{}\n\n{}", COMPLETION_SYSTEM_PREAMBLE, context)),
            ChatMessage::new("user", input),
        ]);
        request.n = Some(max_suggestions);

        debug!(
            "Requesting {} completions, context {} chars",
            max_suggestions,
            context.chars().count()
        );

        let response = self.chat(&request).await?;
        Ok(distinct_suggestions(response, max_suggestions))
    }
}

#[async_trait]
impl SummaryProvider for LlmClient {
    async fn summarize(&self, messages: &[Message], existing: &Summary) -> Result<SummaryOutput> {
        if messages.is_empty() {
            return Ok(SummaryOutput {
                prompt: existing.prompt.clone(),
                key_info: existing.key_info.clone(),
            });
        }

        debug!(
            "Summarizing {} messages (existing version {})",
            messages.len(),
            existing.version
        );

        let mut request = self.request(vec![
            ChatMessage::new("system", SUMMARY_SYSTEM_PROMPT),
            ChatMessage::new("user", self.build_summary_prompt(messages, existing)),
        ]);
        request.max_tokens = Some(self.summary.max_summary_tokens);
        request.temperature = Some(SUMMARY_TEMPERATURE);

        let response = self.chat(&request).await?;
        let raw = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| ContextError::Provider("No choices in response".to_string()))?;

        Ok(parse_summary_reply(&raw, self.summary.key_info_count))
    }
}

/// Non-empty choice texts, deduplicated, in rank order
fn distinct_suggestions(response: ChatCompletionResponse, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .filter(|text| seen.insert(text.clone()))
        .take(max)
        .collect()
}

/// Parse the summarizer's JSON reply; an unparseable reply becomes the prompt
fn parse_summary_reply(raw: &str, key_info_cap: usize) -> SummaryOutput {
    let body = strip_code_fence(raw);

    match serde_json::from_str::<SummaryOutput>(body) {
        Ok(mut output) => {
            output.prompt = output.prompt.trim().to_string();
            output.key_info.truncate(key_info_cap);
            output
        }
        Err(e) => {
            debug!("Summary reply is not JSON ({}), using it verbatim", e);
            SummaryOutput {
                prompt: raw.trim().to_string(),
                key_info: Vec::new(),
            }
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop an optional language tag on the opening fence
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
