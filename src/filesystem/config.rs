/// Configuration for repository file access
#[derive(Debug, Clone)]
pub struct FileSystemConfig {
    /// Extensions (with leading dot) the tree listing keeps; empty keeps all files
    pub allowed_extensions: Vec<String>,

    /// Maximum file size for read operations (bytes)
    pub max_read_size: u64,

    /// Default traversal depth for tree listings and search
    pub max_tree_depth: usize,

    /// Default cap on search results
    pub max_search_results: usize,
}

impl FileSystemConfig {
    /// Extension filter normalized to lowercase with a leading dot
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect()
    }
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: Vec::new(),
            max_read_size: 10 * 1024 * 1024,
            max_tree_depth: 10,
            max_search_results: 50,
        }
    }
}
