//! Wire types shared by the file service and the HTTP API
//!
//! Field names follow the JSON the browser frontend already speaks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a repository file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    /// Slash-joined path from the repository root
    #[serde(rename = "path")]
    pub relative_path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Byte count for files, `null` for directories
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub size: u64,
    pub encoding: String,
    pub mime_type: String,
    pub is_binary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Name,
    Content,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Name => "name",
            SearchKind::Content => "content",
        }
    }
}

impl std::str::FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SearchKind::Name),
            "content" => Ok(SearchKind::Content),
            other => Err(format!("Unknown search type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub entry: TreeEntry,
    /// Case-insensitive occurrence count, content search only
    #[serde(rename = "matches", skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

/// Repository selected by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRepo {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Failures of single-file operations inside a repository.
///
/// Paths carried here are the caller-supplied relative paths, never the
/// absolute location on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileAccessError {
    #[error("File path outside repository")]
    PathEscape { attempted_path: String },
    #[error("File not found")]
    NotFound { path: String },
    #[error("Path is not a file")]
    NotAFile { path: String },
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },
    #[error("File already exists")]
    AlreadyExists { path: String },
    #[error("File too large ({size} bytes, max {max_size} bytes)")]
    TooLarge { path: String, size: u64, max_size: u64 },
    #[error("Binary file not supported for editing")]
    BinaryUnsupported { path: String, size: u64 },
    #[error("Permission denied: {path}")]
    AccessDenied { path: String },
    #[error("{message}")]
    Io { message: String },
}

impl FileAccessError {
    /// Map an I/O failure for `path` onto the closest error kind
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileAccessError::NotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => FileAccessError::AccessDenied {
                path: path.to_string(),
            },
            _ => FileAccessError::Io {
                message: err.to_string(),
            },
        }
    }
}
