use crate::protocol::{SearchKind, SearchResult};

use super::operations::FileOperations;
use super::security::RepositoryRoot;
use super::tree;

#[derive(Clone)]
pub struct FileSearch {
    ops: FileOperations,
}

impl FileSearch {
    pub fn new(ops: FileOperations) -> Self {
        Self { ops }
    }

    /// Search file names or contents in tree order, stopping at `max_results`.
    ///
    /// Walks the full tree (default depth, no extension filter). During content
    /// search any file that cannot be read as text is left out.
    pub async fn search(
        &self,
        root: &RepositoryRoot,
        query: &str,
        kind: SearchKind,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let mut results = Vec::new();
        if max_results == 0 {
            return results;
        }

        let entries = tree::build_tree(root, self.ops.config().max_tree_depth, &[]);
        let needle = query.to_lowercase();

        for entry in entries.into_iter().filter(|e| e.is_file()) {
            let match_count = match kind {
                SearchKind::Name => {
                    if !entry.name.to_lowercase().contains(&needle) {
                        continue;
                    }
                    None
                }
                SearchKind::Content => {
                    let content = match self.ops.read_file(root, &entry.relative_path).await {
                        Ok(file) => file.content.unwrap_or_default(),
                        Err(e) => {
                            tracing::trace!("Search skipping {}: {}", entry.relative_path, e);
                            continue;
                        }
                    };
                    let count = count_occurrences(&content, &needle);
                    if count == 0 {
                        continue;
                    }
                    Some(count)
                }
            };

            results.push(SearchResult { entry, match_count });
            if results.len() >= max_results {
                break;
            }
        }

        results
    }
}

/// Non-overlapping, case-insensitive occurrences of `needle` (already lowercase)
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.to_lowercase().matches(needle).count()
}
