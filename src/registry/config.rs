//! Registry configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::db::DatabaseConfig;
use crate::paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::revisions::RevisionLookup;
use crate::storage::GitSignature;

/// Options for a [`Registry`](super::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Store location and connection settings.
    pub database: DatabaseConfig,
    /// Page size used when a list request asks for 0.
    pub default_page_size: usize,
    /// Upper bound on the page size of a list request.
    pub max_page_size: usize,
    /// How the newest revision with a given currency is found.
    pub revision_lookup: RevisionLookup,
    /// Whether committed changes are published to subscribers.
    pub notifications: bool,
    /// Channel capacity of each notification subscriber.
    pub subscriber_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            revision_lookup: RevisionLookup::default(),
            notifications: true,
            subscriber_capacity: 1024,
        }
    }
}

impl RegistryConfig {
    /// Configuration for a registry stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig::new(path),
            ..Default::default()
        }
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.database.create_if_missing = value;
        self
    }

    pub fn max_connections(mut self, value: usize) -> Self {
        self.database.max_connections = value;
        self
    }

    pub fn transaction_timeout(mut self, value: Duration) -> Self {
        self.database.transaction_timeout = value;
        self
    }

    pub fn signature(mut self, value: GitSignature) -> Self {
        self.database.signature = value;
        self
    }

    pub fn default_page_size(mut self, value: usize) -> Self {
        self.default_page_size = value;
        self
    }

    pub fn max_page_size(mut self, value: usize) -> Self {
        self.max_page_size = value;
        self
    }

    pub fn revision_lookup(mut self, value: RevisionLookup) -> Self {
        self.revision_lookup = value;
        self
    }

    pub fn notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    pub fn subscriber_capacity(mut self, value: usize) -> Self {
        self.subscriber_capacity = value;
        self
    }
}
