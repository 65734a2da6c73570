use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::filesystem::RepositoryRoot;
use crate::protocol::{CurrentRepo, SearchKind, SearchResult, TreeEntry};

use super::{ApiError, AppState, SessionId};

/// Numeric parameters fall back to the configured default when unparsable
#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub max_depth: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub max_results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub file_tree: Vec<TreeEntry>,
    pub repository: CurrentRepo,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: String,
    pub size: u64,
    pub encoding: String,
    pub mime_type: String,
    pub file_path: String,
    pub repository: CurrentRepo,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub message: &'static str,
    pub size: u64,
    pub file_path: String,
    pub repository: CurrentRepo,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    pub file_path: String,
    pub repository: CurrentRepo,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub query: String,
    pub search_type: &'static str,
    pub total_found: usize,
}

/// The session's repository, checked to still exist on disk
pub(super) fn active_repo(
    state: &AppState,
    session: &SessionId,
) -> Result<(CurrentRepo, RepositoryRoot), ApiError> {
    let repo = state
        .sessions
        .current_repo(&session.0)
        .ok_or_else(|| ApiError::bad_request("No repository selected"))?;
    let root = RepositoryRoot::new(&repo.path).map_err(|_| {
        ApiError::NotFound(format!("Repository directory missing: {}/{}", repo.owner, repo.repo))
    })?;
    Ok((repo, root))
}

fn number_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("File path is required"))
}

pub async fn get_tree(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeResponse>, ApiError> {
    let (repository, root) = active_repo(&state, &session)?;
    let max_depth = number_or(
        query.max_depth.as_deref(),
        state.file_system.config().max_tree_depth,
    );

    let file_tree = state.file_system.tree(&root, max_depth);
    tracing::debug!("Tree of {} has {} entries", repository.path, file_tree.len());

    Ok(Json(TreeResponse {
        file_tree,
        repository,
    }))
}

pub async fn get_content(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ContentResponse>, ApiError> {
    let (repository, root) = active_repo(&state, &session)?;
    let file_path = required(query.path)?;

    let file = state
        .file_system
        .ops()
        .read_file(&root, &file_path)
        .await
        .map_err(ApiError::file)?;

    Ok(Json(ContentResponse {
        content: file.content.unwrap_or_default(),
        size: file.size,
        encoding: file.encoding,
        mime_type: file.mime_type,
        file_path,
        repository,
    }))
}

pub async fn save_file(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Option<Json<SaveRequest>>,
) -> Result<Json<WriteResponse>, ApiError> {
    let (repository, root) = active_repo(&state, &session)?;
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let file_path = required(body.path)?;
    let content = body
        .content
        .ok_or_else(|| ApiError::bad_request("File content is required"))?;

    let written = state
        .file_system
        .ops()
        .write_file(&root, &file_path, &content)
        .await
        .map_err(ApiError::file)?;
    tracing::info!("Saved {} ({} bytes)", file_path, written.size);

    Ok(Json(WriteResponse {
        message: "File saved successfully",
        size: written.size,
        file_path,
        repository,
    }))
}

pub async fn create_file(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Option<Json<SaveRequest>>,
) -> Result<Json<WriteResponse>, ApiError> {
    let (repository, root) = active_repo(&state, &session)?;
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let file_path = required(body.path)?;
    let content = body.content.unwrap_or_default();

    let written = state
        .file_system
        .ops()
        .create_file(&root, &file_path, &content)
        .await
        .map_err(ApiError::file)?;
    tracing::info!("Created {} ({} bytes)", file_path, written.size);

    Ok(Json(WriteResponse {
        message: "File created successfully",
        size: written.size,
        file_path,
        repository,
    }))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<PathQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let (repository, root) = active_repo(&state, &session)?;
    let file_path = required(query.path)?;

    state
        .file_system
        .ops()
        .delete_file(&root, &file_path)
        .await
        .map_err(ApiError::file_with_not_found)?;
    tracing::info!("Deleted {}", file_path);

    Ok(Json(DeleteResponse {
        message: "File deleted successfully",
        file_path,
        repository,
    }))
}

pub async fn search_files(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (_repository, root) = active_repo(&state, &session)?;

    let q = query.q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }
    let kind: SearchKind = query
        .search_type
        .as_deref()
        .unwrap_or("name")
        .parse()
        .map_err(ApiError::BadRequest)?;
    let max_results = number_or(
        query.max_results.as_deref(),
        state.file_system.config().max_search_results,
    );

    let results = state
        .file_system
        .search()
        .search(&root, &q, kind, max_results)
        .await;

    Ok(Json(SearchResponse {
        total_found: results.len(),
        results,
        query: q,
        search_type: kind.as_str(),
    }))
}
