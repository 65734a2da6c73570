use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::completion::{format_code_context, CodeContext, CompletionError};
use crate::protocol::ChatMessage;

use super::{ApiError, AppState, SessionId};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub current_file: Option<String>,
    pub file_content: Option<String>,
    pub file_tree: Option<Vec<String>>,
    pub selected_text: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub usage: serde_json::Value,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatConfigResponse {
    pub current_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_history: usize,
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Option<Json<ChatRequest>>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let text = body.message.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Message cannot be empty"));
    }

    let context = format_code_context(&CodeContext {
        current_file: body.current_file.as_deref(),
        file_content: body.file_content.as_deref(),
        file_tree: body.file_tree.as_deref(),
        selected_text: body.selected_text.as_deref(),
    });

    let user_message = ChatMessage::user(text);
    let history = state
        .sessions
        .recent_history(&session.0, state.config.chat.max_history);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(state.completion.create_system_message(Some(&context)));
    messages.extend(history);
    messages.push(user_message.clone());

    let response = state
        .completion
        .chat_completion(&messages, body.model.as_deref(), None, None)
        .await?;
    let reply = response
        .first_text()
        .ok_or(CompletionError::EmptyResponse)?
        .to_string();

    state.sessions.record_exchange(
        &session.0,
        user_message,
        ChatMessage::assistant(reply.clone()),
    );

    Ok(Json(ChatResponse {
        response: reply,
        usage: response.usage,
        model: response
            .model
            .unwrap_or_else(|| state.completion.default_model().to_string()),
    }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.sessions.history(&session.0),
    })
}

pub async fn clear_history(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Json<MessageResponse> {
    state.sessions.clear_history(&session.0);
    Json(MessageResponse {
        message: "Chat history cleared successfully",
    })
}

pub async fn get_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    let models = state
        .completion
        .get_models()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to fetch models: {}", e)))?;
    Ok(Json(ModelsResponse { models }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<ChatConfigResponse> {
    Json(ChatConfigResponse {
        current_model: state.completion.default_model().to_string(),
        max_tokens: state.completion.max_tokens(),
        temperature: state.completion.temperature(),
        max_history: state.config.chat.max_history,
    })
}
