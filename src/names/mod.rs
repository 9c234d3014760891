//! Resource names.
//!
//! Every registry resource is addressed by a hierarchical name such as
//! `projects/demo/apis/petstore/versions/v1/specs/openapi`. This module parses
//! names into typed segments, validates identifiers and derives related
//! names (parents, revisions, tags).
//!
//! The wildcard `-` is accepted by the parsers so that list requests can span
//! collections, but [`ResourceName::validate`] rejects it, so it never reaches
//! a create path.

mod error;
mod resource;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use ulid::Ulid;

pub use error::{InvalidNameError, NameResult};
pub use resource::{
    ApiName, ArtifactName, ArtifactParent, DeploymentName, DeploymentRevisionName, ProjectName, RevisionName,
    SpecName, SpecRevisionName, VersionName,
};

/// the identifier accepted in place of any id in list requests
pub const WILDCARD: &str = "-";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9.\-]{0,61}[a-z0-9])?$").expect("valid identifier regex"));

/// check an identifier against the grammar; the wildcard is rejected
pub fn validate_id(id: &str) -> NameResult<()> {
    if id == WILDCARD {
        return Err(InvalidNameError::WildcardNotAllowed(id.to_string()));
    }
    if !IDENTIFIER_RE.is_match(id) {
        return Err(InvalidNameError::InvalidIdentifier { id: id.to_string() });
    }
    Ok(())
}

/// check a parsed segment: an identifier or the wildcard
pub(crate) fn check_segment(id: &str) -> NameResult<()> {
    if id == WILDCARD {
        return Ok(());
    }
    validate_id(id)
}

/// a fresh identifier for resources created without one
pub fn generate_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Behavior shared by all resource names.
pub trait ResourceName: fmt::Display + fmt::Debug + Clone + PartialEq + FromStr<Err = InvalidNameError> {
    /// human readable kind, used in error messages
    const KIND: &'static str;

    /// `(field, id)` pairs from the outermost segment inwards
    fn ids(&self) -> Vec<(&'static str, &str)>;

    /// reject wildcards and malformed identifiers
    fn validate(&self) -> NameResult<()> {
        for (_, id) in self.ids() {
            validate_id(id)?;
        }
        Ok(())
    }

    /// whether any segment is the wildcard
    fn has_wildcards(&self) -> bool {
        self.ids().iter().any(|(_, id)| *id == WILDCARD)
    }

    /// field equality constraints selecting this name; wildcards select anything
    fn filters(&self) -> Vec<(&'static str, String)> {
        self.ids()
            .into_iter()
            .filter(|(_, id)| *id != WILDCARD)
            .map(|(field, id)| (field, id.to_string()))
            .collect()
    }
}

/// split `name` into ids, expecting `collections[i]/{id}` pairs in order
pub(crate) fn parse_segments(
    name: &str,
    kind: &'static str,
    pattern: &'static str,
    collections: &[&str],
) -> NameResult<Vec<String>> {
    let parts: Vec<&str> = name.split('/').collect();
    if parts.len() != collections.len() * 2 {
        return Err(InvalidNameError::malformed(kind, name, pattern));
    }

    let mut ids = Vec::with_capacity(collections.len());
    for (pair, collection) in parts.chunks(2).zip(collections) {
        if pair[0] != *collection {
            return Err(InvalidNameError::malformed(kind, name, pattern));
        }
        check_segment(pair[1])?;
        ids.push(pair[1].to_string());
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("petstore").is_ok());
        assert!(validate_id("v1.2-beta").is_ok());
        assert!(validate_id("a").is_ok());
        assert!(validate_id(&"a".repeat(63)).is_ok());

        assert!(validate_id("").is_err());
        assert!(validate_id("Petstore").is_err());
        assert!(validate_id("-leading").is_err());
        assert!(validate_id("trailing.").is_err());
        assert!(validate_id("has_underscore").is_err());
        assert!(validate_id(&"a".repeat(64)).is_err());
        assert!(matches!(validate_id("-"), Err(InvalidNameError::WildcardNotAllowed(_))));
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id = generate_id();
        assert_eq!(id.len(), 26);
        assert!(validate_id(&id).is_ok());
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_parse_segments() {
        let ids = parse_segments("projects/p1/apis/-", "api", "projects/{p}/apis/{a}", &["projects", "apis"]).unwrap();
        assert_eq!(ids, vec!["p1", "-"]);

        assert!(parse_segments("projects/p1/apis", "api", "", &["projects", "apis"]).is_err());
        assert!(parse_segments("projects/p1/specs/a", "api", "", &["projects", "apis"]).is_err());
        assert!(parse_segments("projects/P1/apis/a", "api", "", &["projects", "apis"]).is_err());
    }
}
