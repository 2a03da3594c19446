//! Cache configuration

use std::path::PathBuf;

/// Ceiling used when a request does not name one.
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 512 * 1024 * 1024;
/// Span file limit used when a request does not name one.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Configuration for the on-disk cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding span files and the index.
    pub directory: PathBuf,

    /// Ceiling for the sum of all cached bytes.
    pub max_cache_size_bytes: u64,

    /// Largest single span file; longer writes roll over into a new span.
    pub max_file_size_bytes: u64,
}

impl CacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_cache_size_bytes: DEFAULT_MAX_CACHE_SIZE,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_cache_size_bytes = bytes;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.directory.as_os_str().is_empty() {
            return Err("directory cannot be empty".to_string());
        }

        if self.max_cache_size_bytes == 0 {
            return Err("max_cache_size_bytes must be greater than 0".to_string());
        }

        if self.max_file_size_bytes == 0 {
            return Err("max_file_size_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}
