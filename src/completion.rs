//! Chat-completion client for an OpenRouter-compatible API

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ChatSection, OpenRouterSection};
use crate::protocol::ChatMessage;

/// Tree paths included verbatim in the code context
const CONTEXT_TREE_LIMIT: usize = 20;
/// File lines included when no selection is given
const CONTEXT_LINE_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("OpenRouter API key not configured")]
    NotConfigured,
    #[error("OpenRouter API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OpenRouter API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("No response from AI model")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default = "empty_usage")]
    pub usage: serde_json::Value,
}

fn empty_usage() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

/// Optional editor state attached to a chat message
#[derive(Debug, Clone, Default)]
pub struct CodeContext<'a> {
    pub current_file: Option<&'a str>,
    pub file_content: Option<&'a str>,
    pub file_tree: Option<&'a [String]>,
    pub selected_text: Option<&'a str>,
}

pub struct CompletionClient {
    api_key: Option<String>,
    base_url: String,
    default_model: String,
    max_tokens: u32,
    temperature: f32,
    referer: String,
    title: String,
    system_prompt: String,
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn new(section: &OpenRouterSection, chat: &ChatSection) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: Some(section.api_key.clone()).filter(|k| !k.is_empty()),
            base_url: section.base_url.trim_end_matches('/').to_string(),
            default_model: section.default_model.clone(),
            max_tokens: section.max_tokens,
            temperature: section.temperature,
            referer: section.referer.clone(),
            title: section.title.clone(),
            system_prompt: chat.system_prompt.clone(),
            http,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, CompletionError> {
        let key = self.api_key.as_deref().ok_or(CompletionError::NotConfigured)?;
        Ok(request
            .bearer_auth(key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title))
    }

    /// Non-streaming chat completion
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = CompletionRequest {
            model: model.unwrap_or(&self.default_model),
            messages,
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
            temperature: temperature.unwrap_or(self.temperature),
            stream: false,
        };

        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        let response = self.authorized(request)?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Completion request failed with {}", status);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        tracing::debug!(
            "Completion from {} with {} choices",
            parsed.model.as_deref().unwrap_or(body.model),
            parsed.choices.len()
        );
        Ok(parsed)
    }

    /// Models advertised by the provider (`data` array of `/models`)
    pub async fn get_models(&self) -> Result<Vec<serde_json::Value>, CompletionError> {
        #[derive(Deserialize)]
        struct ModelList {
            #[serde(default)]
            data: Vec<serde_json::Value>,
        }

        let request = self.http.get(format!("{}/models", self.base_url));
        let response = self.authorized(request)?.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<ModelList>().await?.data)
    }

    pub fn create_system_message(&self, context: Option<&str>) -> ChatMessage {
        let mut prompt = self.system_prompt.clone();
        if let Some(context) = context.filter(|c| !c.is_empty()) {
            prompt.push_str("\n\nCurrent context:\n");
            prompt.push_str(context);
        }
        ChatMessage::system(prompt)
    }
}

/// Render editor state as a prompt section
pub fn format_code_context(ctx: &CodeContext<'_>) -> String {
    let mut parts = Vec::new();

    if let Some(file) = ctx.current_file.filter(|f| !f.is_empty()) {
        parts.push(format!("Current file: {}", file));
    }

    if let Some(tree) = ctx.file_tree.filter(|t| !t.is_empty()) {
        let shown: Vec<&str> = tree
            .iter()
            .take(CONTEXT_TREE_LIMIT)
            .map(String::as_str)
            .collect();
        parts.push(format!("Repository structure:\n{}", shown.join("\n")));
        if tree.len() > CONTEXT_TREE_LIMIT {
            parts.push(format!(
                "... and {} more files",
                tree.len() - CONTEXT_TREE_LIMIT
            ));
        }
    }

    if let Some(selected) = ctx.selected_text.filter(|s| !s.is_empty()) {
        parts.push(format!("Selected text:\n```\n{}\n```", selected));
    } else if let Some(content) = ctx.file_content.filter(|c| !c.is_empty()) {
        let lines: Vec<&str> = content.split('\n').collect();
        let preview = if lines.len() > CONTEXT_LINE_LIMIT {
            format!("{}\n... (truncated)", lines[..CONTEXT_LINE_LIMIT].join("\n"))
        } else {
            content.to_string()
        };
        parts.push(format!("File content:\n```\n{}\n```", preview));
    }

    parts.join("\n\n")
}
