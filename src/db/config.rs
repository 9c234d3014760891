//! Connection pool configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::GitSignature;

/// Options for opening the git-backed store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the repository directory.
    pub path: PathBuf,
    /// Initialize the repository if it doesn't exist.
    pub create_if_missing: bool,
    /// Connections handed out at once before the pool reports exhaustion.
    pub max_connections: usize,
    /// Transactions older than this are rolled back at commit time.
    pub transaction_timeout: Duration,
    /// Author and committer of every registry commit.
    pub signature: GitSignature,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".registry"),
            create_if_missing: true,
            max_connections: 16,
            transaction_timeout: Duration::from_secs(30),
            signature: GitSignature::registry(),
        }
    }
}

impl DatabaseConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn max_connections(mut self, value: usize) -> Self {
        self.max_connections = value;
        self
    }

    pub fn transaction_timeout(mut self, value: Duration) -> Self {
        self.transaction_timeout = value;
        self
    }

    pub fn signature(mut self, value: GitSignature) -> Self {
        self.signature = value;
        self
    }
}
