use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::github::{CloneOutcome, LocalRepository};
use crate::protocol::CurrentRepo;

use super::{ApiError, AppState, SessionId};

#[derive(Debug, Deserialize)]
pub struct CloneRequest {
    pub url: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryList {
    pub repositories: Vec<LocalRepository>,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub success: bool,
    pub message: &'static str,
    pub repository: LocalRepository,
}

#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    pub current_repo: Option<CurrentRepo>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub info: serde_json::Value,
}

pub async fn clone_repository(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Option<Json<CloneRequest>>,
) -> Result<Json<CloneOutcome>, ApiError> {
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let url = body.url.unwrap_or_default().trim().to_string();
    if url.is_empty() {
        return Err(ApiError::bad_request("Repository URL is required"));
    }

    let outcome = state.github.clone_repository(&url, body.force).await?;
    state.sessions.set_current_repo(
        &session.0,
        CurrentRepo {
            owner: outcome.owner.clone(),
            repo: outcome.repo.clone(),
            path: outcome.path.clone(),
        },
    );

    Ok(Json(outcome))
}

pub async fn list_repositories(State(state): State<AppState>) -> Json<RepositoryList> {
    Json(RepositoryList {
        repositories: state.github.list_local_repositories().await,
    })
}

pub async fn switch_repository(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Option<Json<SwitchRequest>>,
) -> Result<Json<SwitchResponse>, ApiError> {
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let (Some(owner), Some(repo)) = (
        body.owner.filter(|o| !o.is_empty()),
        body.repo.filter(|r| !r.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Owner and repo name are required"));
    };

    let target = state
        .github
        .find_local(&owner, &repo)
        .await
        .ok_or_else(|| ApiError::NotFound("Repository not found locally".to_string()))?;

    state.sessions.set_current_repo(
        &session.0,
        CurrentRepo {
            owner,
            repo,
            path: target.path.clone(),
        },
    );

    Ok(Json(SwitchResponse {
        success: true,
        message: "Switched repository successfully",
        repository: target,
    }))
}

pub async fn current_repository(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Json<CurrentResponse> {
    Json(CurrentResponse {
        current_repo: state.sessions.current_repo(&session.0),
    })
}

pub async fn repository_info(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<InfoResponse>, ApiError> {
    let repo = state
        .sessions
        .current_repo(&session.0)
        .ok_or_else(|| ApiError::bad_request("No repository selected"))?;

    let info = state
        .github
        .get_repository_info(&repo.owner, &repo.repo)
        .await?;

    Ok(Json(InfoResponse { info }))
}
