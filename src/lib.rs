//! apiregistry - a git-backed API registry
//!
//! This crate stores API descriptions (projects, apis, versions, specs,
//! deployments and artifacts) in a git repository. Every table is a
//! directory, every resource a JSON document, and every committed write a
//! git commit, so the full history of the registry lives in `.git/`.
//!
//! Specs and deployments keep a revision history: changing their content
//! produces a new revision while earlier ones stay readable by id or tag.
//! List operations take a filter expression and page through results with
//! opaque page tokens.
//!
//! # Example
//!
//! ```no_run
//! use apiregistry::models::{Api, Model, Project, Spec, Version};
//! use apiregistry::registry::{ListRequest, Registry, RegistryConfig, View};
//!
//! let registry = Registry::open(RegistryConfig::new("./registry")).unwrap();
//! registry.create_project("demo", &Project::default()).unwrap();
//! registry.create_api("projects/demo", "petstore", &Api::default()).unwrap();
//! registry.create_api_version("projects/demo/apis/petstore", "v1", &Version::default()).unwrap();
//!
//! let body = Spec { mime_type: "application/x.openapi+yaml".into(), ..Default::default() };
//! let contents: &[u8] = b"openapi: 3.0.0";
//! registry
//!     .create_api_spec("projects/demo/apis/petstore/versions/v1", "openapi", &body, Some(contents))
//!     .unwrap();
//!
//! let page = registry
//!     .list_api_specs(&ListRequest::new("projects/demo/apis/-/versions/-").filter("mime_type.contains('yaml')"))
//!     .unwrap();
//! let spec = registry.get_api_spec(&page.items[0].spec.name(), View::Full).unwrap();
//! assert!(spec.contents.is_some());
//! ```

pub mod db;
pub mod filter;
pub mod logging;
pub mod models;
pub mod names;
pub mod notify;
pub mod paging;
pub mod registry;
pub mod revisions;
pub mod storage;
pub mod transaction;

pub use registry::{Code, Registry, RegistryConfig, RegistryError, RegistryResult};
