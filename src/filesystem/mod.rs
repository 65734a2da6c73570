//! Repository-scoped file service: path scoping, tree listing, file access, search

pub mod config;
pub mod mime;
pub mod operations;
pub mod path_utils;
pub mod search;
pub mod security;
pub mod tree;


use std::sync::Arc;

use config::FileSystemConfig;
use operations::FileOperations;
use search::FileSearch;

pub use security::RepositoryRoot;

use crate::protocol::TreeEntry;

pub struct FileSystemService {
    config: Arc<FileSystemConfig>,
    allowed_extensions: Vec<String>,
    ops: FileOperations,
    search: FileSearch,
}

impl FileSystemService {
    pub fn new(config: FileSystemConfig) -> Self {
        let allowed_extensions = config.normalized_extensions();
        let config = Arc::new(config);
        let ops = FileOperations::new(config.clone());
        let search = FileSearch::new(ops.clone());
        Self {
            config,
            allowed_extensions,
            ops,
            search,
        }
    }

    pub fn config(&self) -> &FileSystemConfig {
        self.config.as_ref()
    }

    pub fn ops(&self) -> &FileOperations {
        &self.ops
    }

    pub fn search(&self) -> &FileSearch {
        &self.search
    }

    /// Tree listing filtered by the configured extensions
    pub fn tree(&self, root: &RepositoryRoot, max_depth: usize) -> Vec<TreeEntry> {
        tree::build_tree(root, max_depth, &self.allowed_extensions)
    }
}
