//! HTTP API server
//!
//! One axum router serves the JSON API under `/api` and, when configured, the
//! built frontend for every other path.

mod chat;
mod error;
mod files;
mod repo;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::completion::CompletionClient;
use crate::config::AppConfig;
use crate::filesystem::FileSystemService;
use crate::github::GitHubClient;
use crate::session::SessionStore;

pub const SESSION_HEADER: &str = "x-session-id";
pub const SESSION_COOKIE: &str = "repodesk_session";

/// Services shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub file_system: Arc<FileSystemService>,
    pub github: Arc<GitHubClient>,
    pub completion: Arc<CompletionClient>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Build the services, creating the repositories directory if needed
    pub fn from_config(config: AppConfig) -> std::io::Result<Self> {
        let repos_dir = absolute(config.github.repos_directory.clone())?;
        std::fs::create_dir_all(&repos_dir)?;

        let file_system = Arc::new(FileSystemService::new(config.filesystem_config()));
        let github = Arc::new(GitHubClient::new(&config.github, repos_dir));
        let completion = Arc::new(CompletionClient::new(&config.openrouter, &config.chat));

        Ok(Self {
            config: Arc::new(config),
            file_system,
            github,
            completion,
            sessions: Arc::new(SessionStore::new()),
        })
    }
}

fn absolute(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Session id resolved for the current request
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/files/tree", get(files::get_tree))
        .route("/files/content", get(files::get_content))
        .route("/files/save", post(files::save_file))
        .route("/files/create", post(files::create_file))
        .route("/files/delete", delete(files::delete_file))
        .route("/files/search", get(files::search_files))
        .route("/repo/clone", post(repo::clone_repository))
        .route("/repo/list", get(repo::list_repositories))
        .route("/repo/switch", post(repo::switch_repository))
        .route("/repo/current", get(repo::current_repository))
        .route("/repo/info", get(repo::repository_info))
        .route("/chat/message", post(chat::send_message))
        .route("/chat/history", get(chat::get_history))
        .route("/chat/clear", delete(chat::clear_history))
        .route("/chat/models", get(chat::get_models))
        .route("/chat/config", get(chat::get_config));

    let mut app = Router::new().nest("/api", api);

    if let Some(dir) = state.config.app.static_dir.clone() {
        tracing::info!("Serving frontend from {}", dir.display());
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }

    app.layer(middleware::from_fn(session_layer))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Attach a session id to the request, minting one for new browsers
async fn session_layer(mut req: Request, next: Next) -> Response {
    let existing = session_from_headers(req.headers());
    let minted = existing.is_none();
    let id = existing.unwrap_or_else(SessionStore::new_session_id);

    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    if minted {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_valid_session_id(v));
    if let Some(id) = from_header {
        return Some(id.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && is_valid_session_id(value))
        .map(|(_, value)| value.to_string())
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Serve until Ctrl+C (or SIGTERM on Unix)
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.app.host, config.app.port);
    let state = AppState::from_config(config)?;
    tracing::info!("Repositories directory: {}", state.github.repos_dir().display());

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server on {}", listener.local_addr()?);

    serve(listener, state).await?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down (Ctrl+C)");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Shutting down (SIGTERM)");
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                "Failed to set up SIGTERM handler: {:?}. Only Ctrl+C will work for shutdown.",
                e
            );
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down (Ctrl+C)");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down (Ctrl+C)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; repodesk_session=from-cookie"));
        assert_eq!(session_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_invalid_session_ids_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("bad id;"));
        headers.insert(COOKIE, HeaderValue::from_static("repodesk_session="));
        assert!(session_from_headers(&headers).is_none());
    }
}
