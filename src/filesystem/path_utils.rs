use std::path::{Path, PathBuf};

use crate::protocol::FileAccessError;

use super::security::RepositoryRoot;

/// Slash-joined form of `path` relative to the repository root
pub fn to_relative_display(root: &RepositoryRoot, path: &Path) -> String {
    path.strip_prefix(root.path())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Find a component between the root and `dir` that exists as a regular file.
/// This catches targets like `notes.txt/new.txt` before `create_dir_all` does.
pub async fn find_file_component(root: &RepositoryRoot, dir: &Path) -> Option<PathBuf> {
    let relative = dir.strip_prefix(root.path()).ok()?;
    let mut current = root.path().to_path_buf();

    for component in relative.components() {
        current.push(component);
        match tokio::fs::metadata(&current).await {
            Ok(meta) if meta.is_file() => return Some(current),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }

    None
}

/// Create the missing parents of `path`, refusing to treat a file as a directory
pub async fn create_parent_dirs_safe(
    root: &RepositoryRoot,
    path: &Path,
) -> Result<(), FileAccessError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if let Some(file) = find_file_component(root, parent).await {
        return Err(FileAccessError::NotADirectory {
            path: to_relative_display(root, &file),
        });
    }

    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| FileAccessError::from_io(&to_relative_display(root, parent), e))
}
