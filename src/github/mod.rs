//! GitHub repository provider
//!
//! Clones repositories into the repositories directory, lists local clones and
//! fetches repository metadata from the GitHub REST API.

pub mod git;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GitHubSection;

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("Invalid GitHub URL format: {0}")]
    InvalidUrl(String),
    #[error("Git error: {message}")]
    Git { message: String },
    #[error("Failed to clone repository: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to fetch repository info: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of a clone request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneOutcome {
    pub success: bool,
    pub message: String,
    pub path: String,
    pub owner: String,
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub existed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRepository {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
    pub commit: String,
    /// Directory mtime, on the wire as fractional Unix seconds
    #[serde(with = "epoch_seconds")]
    pub last_modified: DateTime<Utc>,
}

mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let seconds = value.timestamp() as f64 + f64::from(value.timestamp_subsec_micros()) / 1e6;
        serializer.serialize_f64(seconds)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", seconds)))
    }
}

pub struct GitHubClient {
    access_token: Option<String>,
    repos_dir: PathBuf,
    api_base_url: String,
    http: reqwest::Client,
}

impl GitHubClient {
    /// `repos_dir` must already be absolute
    pub fn new(section: &GitHubSection, repos_dir: PathBuf) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("repodesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let access_token = Some(section.access_token.clone()).filter(|t| !t.is_empty());

        Self {
            access_token,
            repos_dir,
            api_base_url: section.api_base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Clone into `<repos_dir>/<owner>_<repo>`, reusing an existing clone unless `force`
    pub async fn clone_repository(
        &self,
        url: &str,
        force: bool,
    ) -> Result<CloneOutcome, GitHubError> {
        let (owner, repo) = parse_github_url(url)?;
        let local_path = self.repos_dir.join(format!("{}_{}", owner, repo));
        let path = local_path.display().to_string();

        if tokio::fs::try_exists(&local_path).await? {
            if !force {
                return Ok(CloneOutcome {
                    success: true,
                    message: "Repository already exists".to_string(),
                    path,
                    owner,
                    repo,
                    branch: None,
                    commit: None,
                    existed: true,
                });
            }
            tracing::info!("Removing existing clone at {}", path);
            tokio::fs::remove_dir_all(&local_path).await?;
        }

        let clone_url = match &self.access_token {
            Some(token) => format!("https://{}@github.com/{}/{}.git", token, owner, repo),
            None => format!("https://github.com/{}/{}.git", owner, repo),
        };

        tracing::info!("Cloning {}/{} into {}", owner, repo, path);
        git::clone(&clone_url, &local_path, self.access_token.as_deref()).await?;

        let head = git::head_info(&local_path).await;
        Ok(CloneOutcome {
            success: true,
            message: "Repository cloned successfully".to_string(),
            path,
            owner,
            repo,
            branch: head.as_ref().map(|h| h.branch.clone()),
            commit: head.map(|h| h.commit),
            existed: false,
        })
    }

    /// Local clones, most recently modified first
    pub async fn list_local_repositories(&self) -> Vec<LocalRepository> {
        let mut repos = Vec::new();

        let mut read_dir = match tokio::fs::read_dir(&self.repos_dir).await {
            Ok(rd) => rd,
            Err(e) => {
                tracing::warn!(
                    "Cannot list repositories in {}: {}",
                    self.repos_dir.display(),
                    e
                );
                return repos;
            }
        };

        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_dir() || !path.join(".git").exists() {
                continue;
            }

            let dir_name = entry.file_name().to_string_lossy().to_string();
            let (owner, repo) = split_dir_name(&dir_name);
            let head = git::head_info(&path).await;
            let last_modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            repos.push(LocalRepository {
                owner,
                repo,
                path: path.display().to_string(),
                branch: head
                    .as_ref()
                    .map(|h| h.branch.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                commit: head
                    .map(|h| h.commit)
                    .unwrap_or_else(|| "unknown".to_string()),
                last_modified,
            });
        }

        repos.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        repos
    }

    pub async fn find_local(&self, owner: &str, repo: &str) -> Option<LocalRepository> {
        self.list_local_repositories()
            .await
            .into_iter()
            .find(|r| r.owner == owner && r.repo == repo)
    }

    /// Repository metadata from the GitHub API; API errors come back as JSON
    pub async fn get_repository_info(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<serde_json::Value, GitHubError> {
        let url = format!("{}/repos/{}/{}", self.api_base_url, owner, repo);
        let mut request = self.http.get(&url).header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("GitHub API returned {} for {}/{}", status, owner, repo);
        Ok(serde_json::json!({
            "error": format!("GitHub API error: {}", status.as_u16()),
            "message": body,
        }))
    }
}

/// Extract `(owner, repo)` from an SSH or HTTPS GitHub URL
pub fn parse_github_url(url: &str) -> Result<(String, String), GitHubError> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("git@github.com:") {
        rest
    } else {
        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| GitHubError::InvalidUrl(url.to_string()))?;
        let host_end = without_scheme.find('/').unwrap_or(without_scheme.len());
        let host = &without_scheme[..host_end];
        // Allow credentials in the authority part: https://user@github.com/...
        let host = host.rsplit('@').next().unwrap_or(host);
        if !host.eq_ignore_ascii_case("github.com")
            && !host.eq_ignore_ascii_case("www.github.com")
        {
            return Err(GitHubError::InvalidUrl(url.to_string()));
        }
        &without_scheme[host_end..]
    };

    let path = path
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or("")
        .trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let parts: Vec<&str> = path.split('/').collect();
    match parts.as_slice() {
        [owner, repo] if valid_segment(owner) && valid_segment(repo) => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GitHubError::InvalidUrl(url.to_string())),
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// `<owner>_<repo>` directory names; anything else is `unknown/<name>`
fn split_dir_name(name: &str) -> (String, String) {
    match name.split_once('_') {
        Some((owner, repo)) => (owner.to_string(), repo.to_string()),
        None => ("unknown".to_string(), name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https_and_ssh_urls() {
        for url in [
            "https://github.com/rust-lang/cargo",
            "https://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo/",
            "http://www.github.com/rust-lang/cargo",
            "git@github.com:rust-lang/cargo.git",
            "git@github.com:rust-lang/cargo",
        ] {
            let (owner, repo) = parse_github_url(url).unwrap();
            assert_eq!((owner.as_str(), repo.as_str()), ("rust-lang", "cargo"), "{url}");
        }
    }

    #[test]
    fn test_parse_rejects_other_hosts_and_shapes() {
        for url in [
            "https://gitlab.com/rust-lang/cargo",
            "https://github.com/rust-lang",
            "https://github.com/rust-lang/cargo/tree/master",
            "https://github.com/../etc",
            "ftp://github.com/a/b",
            "not a url",
        ] {
            assert!(parse_github_url(url).is_err(), "{url}");
        }
    }

    #[test]
    fn test_split_dir_name() {
        assert_eq!(
            split_dir_name("octo_hello_world"),
            ("octo".to_string(), "hello_world".to_string())
        );
        assert_eq!(
            split_dir_name("plain"),
            ("unknown".to_string(), "plain".to_string())
        );
    }

    #[test]
    fn test_last_modified_is_unix_seconds_on_the_wire() {
        let repo = LocalRepository {
            owner: "octo".to_string(),
            repo: "demo".to_string(),
            path: "/tmp/octo_demo".to_string(),
            branch: "main".to_string(),
            commit: "abcd1234".to_string(),
            last_modified: DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap(),
        };

        let value = serde_json::to_value(&repo).unwrap();
        assert_eq!(value["last_modified"].as_f64(), Some(1_700_000_000.25));

        let back: LocalRepository = serde_json::from_value(value).unwrap();
        assert_eq!(back, repo);
    }

    #[test]
    fn test_redact_hides_token() {
        let text = "fatal: could not read from https://ghp_secret@github.com/a/b.git";
        assert_eq!(
            git::redact(text, Some("ghp_secret")),
            "fatal: could not read from https://***@github.com/a/b.git"
        );
        assert_eq!(git::redact(text, None), text);
    }

    #[tokio::test]
    async fn test_list_local_repositories_without_git_metadata_falls_back() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("octo_demo/.git")).unwrap();
        std::fs::create_dir_all(temp.path().join("not_a_repo")).unwrap();
        std::fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let client = GitHubClient::new(&GitHubSection::default(), temp.path().to_path_buf());
        let repos = client.list_local_repositories().await;

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].owner, "octo");
        assert_eq!(repos[0].repo, "demo");
        assert!(client.find_local("octo", "demo").await.is_some());
        assert!(client.find_local("octo", "missing").await.is_none());
    }

    #[tokio::test]
    async fn test_clone_into_existing_directory_is_reused() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("octo_demo")).unwrap();

        let client = GitHubClient::new(&GitHubSection::default(), temp.path().to_path_buf());
        let outcome = client
            .clone_repository("https://github.com/octo/demo", false)
            .await
            .unwrap();
        assert!(outcome.existed);
        assert_eq!(outcome.message, "Repository already exists");
    }
}
