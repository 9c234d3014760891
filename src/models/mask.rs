//! Field masks for partial updates.

use thiserror::Error;

/// Paths selecting which fields of an update body are applied.
///
/// - empty: every field that is set (non-empty) in the body
/// - `*`: every mutable field, clearing the ones left empty
/// - otherwise: exactly the listed fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("field {0:?} cannot be updated")]
    UnknownField(String),
}

/// How one mutable field takes part in an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// not part of the update
    Skip,
    /// copied from the body when the body value is non-empty
    IfSet,
    /// copied from the body unconditionally
    Always,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// the mask selecting every mutable field
    pub fn all() -> Self {
        Self::new(["*"])
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.paths.iter().any(|p| p == "*")
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// reject paths that are not in `mutable`
    pub fn validate(&self, mutable: &[&str]) -> Result<(), MaskError> {
        match self
            .paths
            .iter()
            .find(|p| p.as_str() != "*" && !mutable.contains(&p.as_str()))
        {
            Some(unknown) => Err(MaskError::UnknownField(unknown.clone())),
            None => Ok(()),
        }
    }

    /// how `field` takes part in an update under this mask
    pub fn selection(&self, field: &str) -> Selection {
        if self.is_empty() {
            Selection::IfSet
        } else if self.is_wildcard() || self.contains(field) {
            Selection::Always
        } else {
            Selection::Skip
        }
    }
}

/// something that can be tested for emptiness in an update body
pub trait Emptiable {
    fn is_unset(&self) -> bool;
}

impl Emptiable for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Emptiable for std::collections::BTreeMap<K, V> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

/// copy `source` into `target` if the mask selects `field`; returns whether it was copied
pub fn apply_field<T: Clone + Emptiable>(mask: &FieldMask, field: &str, target: &mut T, source: &T) -> bool {
    let copy = match mask.selection(field) {
        Selection::Skip => false,
        Selection::IfSet => !source.is_unset(),
        Selection::Always => true,
    };
    if copy {
        *target = source.clone();
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection() {
        assert_eq!(FieldMask::default().selection("description"), Selection::IfSet);
        assert_eq!(FieldMask::all().selection("description"), Selection::Always);

        let mask = FieldMask::new(["labels"]);
        assert_eq!(mask.selection("labels"), Selection::Always);
        assert_eq!(mask.selection("description"), Selection::Skip);
    }

    #[test]
    fn test_validate_rejects_unknown_paths() {
        let mutable = ["description", "labels"];
        assert!(FieldMask::new(["description", "*"]).validate(&mutable).is_ok());
        assert_eq!(
            FieldMask::new(["create_time"]).validate(&mutable),
            Err(MaskError::UnknownField("create_time".into()))
        );
    }

    #[test]
    fn test_apply_field() {
        let mut target = "old".to_string();

        assert!(!apply_field(&FieldMask::default(), "description", &mut target, &String::new()));
        assert_eq!(target, "old");

        assert!(apply_field(&FieldMask::all(), "description", &mut target, &String::new()));
        assert_eq!(target, "");
    }
}
