//! Application configuration
//!
//! Loaded once at startup from a YAML file. Every section and field has a
//! default, so an empty or missing file yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::filesystem::config::FileSystemConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: ServerSection,
    pub github: GitHubSection,
    pub openrouter: OpenRouterSection,
    pub filesystem: FileSystemSection,
    pub chat: ChatSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// Built frontend to serve for non-API paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub access_token: String,
    pub repos_directory: PathBuf,
    pub api_base_url: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            repos_directory: PathBuf::from("./repos"),
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSection {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sent as `HTTP-Referer`
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
}

impl Default for OpenRouterSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            default_model: "google/gemini-2.0-flash-exp:free".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            referer: "http://localhost:5000".to_string(),
            title: "Web Agent IDE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemSection {
    pub allowed_extensions: Vec<String>,
    /// Read limit in MiB
    pub max_file_size: u64,
    pub max_tree_depth: usize,
    pub max_search_results: usize,
}

impl Default for FileSystemSection {
    fn default() -> Self {
        Self {
            allowed_extensions: Vec::new(),
            max_file_size: 10,
            max_tree_depth: 10,
            max_search_results: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub system_prompt: String,
    /// Most recent history messages sent with each request
    pub max_history: usize,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful coding assistant integrated into a web-based IDE."
                .to_string(),
            max_history: 50,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file falls back to defaults; a malformed one
    /// is an error. Callers report the missing-file case themselves since
    /// logging is usually configured from the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply `OPENROUTER_API_KEY` / `GITHUB_TOKEN` when set
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENROUTER_API_KEY").filter(|v| !v.is_empty()) {
            self.openrouter.api_key = key;
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|v| !v.is_empty()) {
            self.github.access_token = token;
        }
    }

    pub fn filesystem_config(&self) -> FileSystemConfig {
        FileSystemConfig {
            allowed_extensions: self.filesystem.allowed_extensions.clone(),
            max_read_size: self.filesystem.max_file_size.saturating_mul(1024 * 1024),
            max_tree_depth: self.filesystem.max_tree_depth,
            max_search_results: self.filesystem.max_search_results,
        }
    }
}
