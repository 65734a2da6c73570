use std::path::Path;

use tokio::process::Command;

use super::GitHubError;

/// Branch and short commit of a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    pub branch: String,
    pub commit: String,
}

/// `git clone <url> <dest>`; any occurrence of `secret` in git's output is redacted
pub async fn clone(url: &str, dest: &Path, secret: Option<&str>) -> Result<(), GitHubError> {
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(dest)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .await
        .map_err(|e| GitHubError::Git {
            message: format!("failed to run git: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitHubError::Git {
            message: redact(stderr.trim(), secret),
        });
    }

    Ok(())
}

/// Current branch and 8-char commit, `None` when `repo` is not a usable repository
pub async fn head_info(repo: &Path) -> Option<HeadInfo> {
    let branch = rev_parse(repo, &["--abbrev-ref", "HEAD"]).await?;
    let commit = rev_parse(repo, &["--short=8", "HEAD"]).await?;
    Some(HeadInfo { branch, commit })
}

async fn rev_parse(repo: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .arg("rev-parse")
        .args(args)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, "***"),
        _ => text.to_string(),
    }
}
