//! The registry: resource operations over a store backend.
//!
//! [`Registry`] ties the layers together. Every operation parses and
//! validates the names it is given, takes one connection from the backend,
//! runs its reads and writes through the revision store or directly against
//! the rows, and publishes a change notification after its writes commit.
//!
//! ```no_run
//! use apiregistry::models::Project;
//! use apiregistry::registry::{Registry, RegistryConfig};
//!
//! let registry = Registry::open(RegistryConfig::new("/var/lib/registry"))?;
//! registry.create_project("demo", &Project::default())?;
//! # Ok::<(), apiregistry::registry::RegistryError>(())
//! ```

mod artifacts;
mod backend;
mod config;
mod containers;
mod deployments;
mod error;
mod list;
mod messages;
mod revisioned;
mod schemas;
mod specs;

use crate::db::ConnectionPool;
use crate::notify::{ChangeKind, ChangeNotifier, Notification, Subscription};
use crate::revisions::RevisionStore;
use crate::storage::MemoryStore;

pub use backend::Backend;
pub use config::RegistryConfig;
pub use error::{Code, RegistryError, RegistryResult};
pub use messages::{ApiSpec, Contents, ListRequest, ListResponse, UpdateOptions, View};

/// API registry over a store backend.
///
/// Safe to share between threads when the backend is; each call takes its
/// own connection.
pub struct Registry<B: Backend = ConnectionPool> {
    backend: B,
    revisions: RevisionStore,
    notifier: ChangeNotifier,
    config: RegistryConfig,
}

impl Registry<ConnectionPool> {
    /// open (or create) the git-backed registry described by `config`
    pub fn open(config: RegistryConfig) -> RegistryResult<Self> {
        let pool = ConnectionPool::open(&config.database)?;
        tracing::info!(path = %config.database.path.display(), "opened registry");
        Ok(Self::with_backend(pool, config))
    }
}

impl Registry<MemoryStore> {
    /// a registry that keeps everything in memory
    pub fn in_memory(config: RegistryConfig) -> Self {
        Self::with_backend(MemoryStore::new(), config)
    }
}

impl<B: Backend> Registry<B> {
    pub fn with_backend(backend: B, config: RegistryConfig) -> Self {
        Self {
            backend,
            revisions: RevisionStore::new(config.revision_lookup),
            notifier: ChangeNotifier::new(config.notifications),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// receive a notification for every committed change from now on
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe(self.config.subscriber_capacity)
    }

    fn connect(&self) -> RegistryResult<B::Conn> {
        Ok(self.backend.connect()?)
    }

    fn notify(&self, kind: ChangeKind, resource: impl Into<String>) {
        self.notifier.notify(Notification::new(kind, resource));
    }
}

impl<B: Backend> std::fmt::Debug for Registry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("revisions", &self.revisions)
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
