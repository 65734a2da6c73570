use std::path::{Component, Path, PathBuf};

use crate::protocol::FileAccessError;

/// Working directory of one cloned repository.
///
/// Always absolute and, at construction time, an existing directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRoot(PathBuf);

impl RepositoryRoot {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, FileAccessError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| FileAccessError::from_io(&display, e))?
                .join(path)
        };
        let normalized = normalize(&absolute);

        if !normalized.is_dir() {
            return Err(FileAccessError::NotFound { path: display });
        }

        Ok(Self(normalized))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for RepositoryRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolve an untrusted relative path against a repository root.
///
/// Root and drive prefixes in `relative` are dropped, so `/etc/passwd` means
/// `<root>/etc/passwd`. The result is normalized lexically and must sit strictly
/// below the root, compared component by component.
pub fn resolve(root: &RepositoryRoot, relative: &str) -> Result<PathBuf, FileAccessError> {
    let escape = || FileAccessError::PathEscape {
        attempted_path: relative.to_string(),
    };

    let mut resolved = root.path().to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(segment) => resolved.push(segment),
        }
    }

    if resolved == root.path() || !resolved.starts_with(root.path()) {
        return Err(escape());
    }

    Ok(resolved)
}

/// Lexical normalization: drop `.`, let `..` pop one component
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
