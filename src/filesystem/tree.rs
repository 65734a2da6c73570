use std::ffi::OsStr;
use std::path::{Component, Path};

use walkdir::{DirEntry, WalkDir};

use crate::protocol::{EntryKind, TreeEntry};

use super::security::RepositoryRoot;

/// Dotfiles that stay visible in the tree
pub const ALLOWED_DOTFILES: &[&str] = &[".gitignore", ".env"];

/// Tooling directories skipped together with their subtree
pub const EXCLUDED_NAMES: &[&str] = &["node_modules", "__pycache__", ".git", "venv", "env"];

/// What happened to a single walk item
#[derive(Debug)]
enum EntryOutcome {
    Included(TreeEntry),
    Excluded,
    Skipped { path: String, reason: String },
}

/// Whether an entry name is hidden from listings
pub fn is_excluded_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    if EXCLUDED_NAMES.contains(&name.as_ref()) {
        return true;
    }
    name.starts_with('.') && !ALLOWED_DOTFILES.contains(&name.as_ref())
}

/// Depth-first listing of `root`, entries sorted by name within each directory.
///
/// Top-level entries have depth 0 and a directory at depth `d` is only
/// descended into when `d + 1 <= max_depth`. `allowed_extensions` must already
/// be lowercase with a leading dot; empty keeps every file.
///
/// Unreadable entries are skipped, so the result may be partial but the call
/// itself never fails.
pub fn build_tree(
    root: &RepositoryRoot,
    max_depth: usize,
    allowed_extensions: &[String],
) -> Vec<TreeEntry> {
    let walker = WalkDir::new(root.path())
        .min_depth(1)
        .max_depth(max_depth.saturating_add(1))
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded_name(entry.file_name()));

    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for item in walker {
        let outcome = match item {
            Ok(entry) => classify(root.path(), &entry, allowed_extensions),
            Err(e) => EntryOutcome::Skipped {
                path: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reason: e.to_string(),
            },
        };

        match outcome {
            EntryOutcome::Included(entry) => entries.push(entry),
            EntryOutcome::Excluded => {}
            EntryOutcome::Skipped { path, reason } => {
                skipped += 1;
                tracing::debug!("Skipping tree entry {}: {}", path, reason);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(
            "Tree listing of {} skipped {} unreadable entries",
            root.path().display(),
            skipped
        );
    }

    entries
}

fn classify(root: &Path, entry: &DirEntry, allowed_extensions: &[String]) -> EntryOutcome {
    let path = entry.path();
    // Resolve symlinks to their target kind; walkdir never descends through them.
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            return EntryOutcome::Skipped {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        }
    };

    let Some(relative_path) = relative_slash_path(root, path) else {
        return EntryOutcome::Excluded;
    };
    let name = entry.file_name().to_string_lossy().to_string();

    if metadata.is_dir() {
        EntryOutcome::Included(TreeEntry {
            name,
            relative_path,
            kind: EntryKind::Directory,
            size: None,
        })
    } else if metadata.is_file() {
        if !extension_allowed(&name, allowed_extensions) {
            return EntryOutcome::Excluded;
        }
        EntryOutcome::Included(TreeEntry {
            name,
            relative_path,
            kind: EntryKind::File,
            size: Some(metadata.len()),
        })
    } else {
        EntryOutcome::Excluded
    }
}

fn extension_allowed(name: &str, allowed_extensions: &[String]) -> bool {
    if allowed_extensions.is_empty() {
        return true;
    }
    let ext = match Path::new(name).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => return false,
    };
    allowed_extensions.iter().any(|allowed| *allowed == ext)
}

/// `a/b/c.txt` style path of `path` below `root`
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
