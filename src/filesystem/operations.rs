use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::protocol::{FileAccessError, FileContent, WriteResult};

use super::config::FileSystemConfig;
use super::mime;
use super::path_utils;
use super::security::{self, RepositoryRoot};

pub const TEXT_ENCODING: &str = "utf-8";

#[derive(Clone)]
pub struct FileOperations {
    config: Arc<FileSystemConfig>,
}

impl FileOperations {
    pub fn new(config: Arc<FileSystemConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FileSystemConfig {
        &self.config
    }

    /// Read a file as UTF-8 text
    pub async fn read_file(
        &self,
        root: &RepositoryRoot,
        relative: &str,
    ) -> Result<FileContent, FileAccessError> {
        let path = security::resolve(root, relative)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| FileAccessError::from_io(relative, e))?;

        if !metadata.is_file() {
            return Err(FileAccessError::NotAFile {
                path: relative.to_string(),
            });
        }

        let size = metadata.len();
        let max_size = self.config.max_read_size;
        if size > max_size {
            return Err(FileAccessError::TooLarge {
                path: relative.to_string(),
                size,
                max_size,
            });
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| FileAccessError::from_io(relative, e))?;

        let text = decode_text(bytes).ok_or_else(|| FileAccessError::BinaryUnsupported {
            path: relative.to_string(),
            size,
        })?;

        Ok(FileContent {
            content: Some(text),
            size,
            encoding: TEXT_ENCODING.to_string(),
            mime_type: mime::guess_mime_from_name(&file_name(&path)),
            is_binary: false,
        })
    }

    /// Write (create or replace) a file with the given text.
    ///
    /// Content goes to a sibling temp file first and is renamed into place.
    pub async fn write_file(
        &self,
        root: &RepositoryRoot,
        relative: &str,
        content: &str,
    ) -> Result<WriteResult, FileAccessError> {
        let path = security::resolve(root, relative)?;

        if let Ok(meta) = fs::metadata(&path).await {
            if meta.is_dir() {
                return Err(FileAccessError::NotAFile {
                    path: relative.to_string(),
                });
            }
        }

        path_utils::create_parent_dirs_safe(root, &path).await?;

        let bytes = content.as_bytes();
        let temp_path = sibling_with_suffix(&path, &format!("tmp-{}", uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(FileAccessError::from_io(relative, e));
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(FileAccessError::Io {
                message: format!("Failed to replace file: {}", e),
            });
        }

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), relative);

        Ok(WriteResult {
            size: bytes.len() as u64,
        })
    }

    /// Write a new file, refusing to touch one that already exists
    pub async fn create_file(
        &self,
        root: &RepositoryRoot,
        relative: &str,
        content: &str,
    ) -> Result<WriteResult, FileAccessError> {
        let path = security::resolve(root, relative)?;

        if fs::symlink_metadata(&path).await.is_ok() {
            return Err(FileAccessError::AlreadyExists {
                path: relative.to_string(),
            });
        }

        self.write_file(root, relative, content).await
    }

    /// Delete a regular file
    pub async fn delete_file(
        &self,
        root: &RepositoryRoot,
        relative: &str,
    ) -> Result<(), FileAccessError> {
        let path = security::resolve(root, relative)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| FileAccessError::from_io(relative, e))?;

        if !metadata.is_file() {
            return Err(FileAccessError::NotAFile {
                path: relative.to_string(),
            });
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| FileAccessError::from_io(relative, e))?;

        tracing::debug!("Deleted {}", relative);
        Ok(())
    }
}

/// UTF-8 text, or `None` for binary content
fn decode_text(bytes: Vec<u8>) -> Option<String> {
    String::from_utf8(bytes).ok()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("file"));
    file_name.push(".");
    file_name.push(suffix);
    path.with_file_name(file_name)
}
