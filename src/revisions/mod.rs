//! Revision history for specs and deployments.
//!
//! A revisioned resource is stored as one row per revision, keyed by
//! `{name}@{revision_id}`. The revision id is derived from the fields that
//! define the revision's content, so saving identical content again lands on
//! the same row. Exactly one revision of a logical resource carries
//! [`Currency::Current`]; every write that moves the marker runs in a single
//! transaction.
//!
//! [`RevisionStore`] holds the algorithm once and is generic over
//! [`Revisioned`], which [`Spec`](crate::models::Spec) and
//! [`Deployment`](crate::models::Deployment) implement.

pub mod cascade;
mod error;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{key_of, revision_id, Blob, Currency, FieldMask, MaskError, Model, RevisionTag, Version};
use crate::names::{validate_id, ResourceName, RevisionName, VersionName};
use crate::storage::{Query, Row, StorageResult, Store, TableName, TransactionalStore};

pub use error::{RevisionError, RevisionResult};

/// A resource kind with revision history.
pub trait Revisioned: Model + Clone + fmt::Debug {
    /// name of the logical resource, without revision
    type Name: ResourceName;

    /// table holding the revision tags of this kind
    const TAG_TABLE: &'static str;

    /// whether each revision stores a content blob
    const HAS_CONTENTS: bool;

    fn logical_name(&self) -> Self::Name;

    fn parent_of(name: &Self::Name) -> VersionName;

    /// first revision of `name`, current, with an empty revision id
    fn new_revision(name: &Self::Name, body: &Self, contents: Option<&[u8]>) -> StorageResult<Self>;

    /// values of the content-defining fields
    fn fingerprint(&self) -> Vec<&str>;

    fn revision_id(&self) -> &str;

    fn set_revision_id(&mut self, id: String);

    fn currency(&self) -> Currency;

    fn set_currency(&mut self, currency: Currency);

    fn revision_create_time(&self) -> DateTime<Utc>;

    /// touch the revision timestamps; a new revision also resets its creation time
    fn stamp(&mut self, new_revision: bool);

    fn mutable_fields() -> &'static [&'static str];

    /// apply `body` under `mask`, returning whether the update touches the contents
    fn apply_update(&mut self, body: &Self, contents: Option<&[u8]>, mask: &FieldMask) -> Result<bool, MaskError>;

    /// record size and hash of new contents
    fn record_contents(&mut self, _contents: &[u8]) -> StorageResult<()> {
        Ok(())
    }

    /// mime type of the contents blob
    fn content_type(&self) -> &str {
        ""
    }
}

/// How the newest revision with a given currency is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionLookup {
    /// take the first row of a query ordered by revision creation time
    #[default]
    TrustStoreOrder,
    /// read every candidate and pick the newest here
    ResortClientSide,
}

/// Result of [`RevisionStore::update_current`].
#[derive(Debug, Clone)]
pub struct UpdateOutcome<R> {
    pub revision: R,
    /// the resource did not exist and was created
    pub created: bool,
    /// the update produced a new revision
    pub new_revision: bool,
}

/// revisions of `name`, newest first
///
/// wildcards in `name` select across collections
pub fn revision_query<R: Revisioned>(name: &R::Name) -> RevisionResult<Query> {
    let mut query = Query::new(R::table()?);
    for (field, id) in name.filters() {
        query = query.require(field, id);
    }
    Ok(query.order_by_desc("revision_create_time"))
}

/// tags on the logical resource `name`
pub fn tag_query<R: Revisioned>(name: &R::Name) -> RevisionResult<Query> {
    Ok(Query::new(tag_table::<R>()?).require("owner", name.to_string()))
}

fn tag_table<R: Revisioned>() -> StorageResult<TableName> {
    Ok(TableName::new(R::TAG_TABLE)?)
}

fn kind<R: Revisioned>() -> &'static str {
    <R::Name as ResourceName>::KIND
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionStore {
    lookup: RevisionLookup,
}

impl RevisionStore {
    pub fn new(lookup: RevisionLookup) -> Self {
        Self { lookup }
    }

    pub fn lookup(&self) -> RevisionLookup {
        self.lookup
    }

    /// newest revision of `name` carrying `currency`
    pub fn latest<R: Revisioned>(
        &self,
        store: &mut dyn Store,
        name: &R::Name,
        currency: Currency,
    ) -> RevisionResult<Option<R>> {
        let query = revision_query::<R>(name)?.require("currency", currency.as_str());

        match self.lookup {
            RevisionLookup::TrustStoreOrder => match store.run(&query)?.next() {
                Some(row) => Ok(Some(R::from_row(&row)?)),
                None => Ok(None),
            },
            RevisionLookup::ResortClientSide => {
                let query = Query { order: None, ..query };
                let mut newest: Option<R> = None;
                for row in store.run(&query)? {
                    let revision = R::from_row(&row)?;
                    let newer = newest
                        .as_ref()
                        .map_or(true, |n| revision.revision_create_time() > n.revision_create_time());
                    if newer {
                        newest = Some(revision);
                    }
                }
                Ok(newest)
            }
        }
    }

    pub fn get_current<R: Revisioned>(&self, store: &mut dyn Store, name: &R::Name) -> RevisionResult<R> {
        self.latest::<R>(store, name, Currency::Current)?
            .ok_or_else(|| RevisionError::not_found(kind::<R>(), name))
    }

    /// a revision by id or by tag, whatever its currency
    pub fn get_revision<R: Revisioned>(
        &self,
        store: &mut dyn Store,
        name: &RevisionName<R::Name>,
    ) -> RevisionResult<R> {
        resolve::<R>(store, name)?.ok_or_else(|| RevisionError::not_found("revision", name))
    }

    /// the contents blob of `revision`
    pub fn contents<R: Revisioned>(&self, store: &mut dyn Store, revision: &R) -> RevisionResult<Blob> {
        match store.get(&Blob::table()?, &revision.key()?)? {
            Some(row) => Ok(Blob::from_row(&row)?),
            None => Err(RevisionError::not_found("contents", revision.name())),
        }
    }

    pub fn create<R, S>(&self, store: &mut S, name: &R::Name, body: &R, contents: Option<&[u8]>) -> RevisionResult<R>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.validate()?;
        let created = store.transaction(|tx| self.create_in::<R>(tx, name, body, contents))?;
        tracing::info!(kind = kind::<R>(), name = %created.name(), "created revision");
        Ok(created)
    }

    fn create_in<R: Revisioned>(
        &self,
        tx: &mut dyn Store,
        name: &R::Name,
        body: &R,
        contents: Option<&[u8]>,
    ) -> RevisionResult<R> {
        let parent = R::parent_of(name);
        if tx.get(&Version::table()?, &key_of(&parent)?)?.is_none() {
            return Err(RevisionError::not_found("version", parent));
        }
        if tx.run(&revision_query::<R>(name)?)?.next().is_some() {
            return Err(RevisionError::already_exists(kind::<R>(), name));
        }

        let mut revision = R::new_revision(name, body, contents)?;
        revision.set_revision_id(revision_id(&revision.fingerprint())?);
        tx.save(&R::table()?, revision.to_row()?)?;

        if R::HAS_CONTENTS {
            let blob = Blob::new(
                revision.name(),
                revision.content_type(),
                contents.unwrap_or_default().to_vec(),
            )?;
            tx.save(&Blob::table()?, blob.to_row()?)?;
        }
        Ok(revision)
    }

    /// apply an update to the current revision of `name`
    ///
    /// A change to a content-defining field produces a new current revision
    /// and keeps the old one as non-current. Other changes are made in place.
    pub fn update_current<R, S>(
        &self,
        store: &mut S,
        name: &R::Name,
        body: &R,
        contents: Option<&[u8]>,
        mask: &FieldMask,
        allow_missing: bool,
    ) -> RevisionResult<UpdateOutcome<R>>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.validate()?;
        mask.validate(R::mutable_fields())?;

        let outcome = store.transaction(|tx| {
            let Some(current) = self.latest::<R>(tx, name, Currency::Current)? else {
                if !allow_missing {
                    return Err(RevisionError::not_found(kind::<R>(), name));
                }
                return Ok(UpdateOutcome {
                    revision: self.create_in::<R>(tx, name, body, contents)?,
                    created: true,
                    new_revision: true,
                });
            };

            let mut next = current.clone();
            let touched = next.apply_update(body, contents, mask)?;
            if touched {
                next.record_contents(contents.unwrap_or_default())?;
            }

            let id = revision_id(&next.fingerprint())?;
            if id == current.revision_id() {
                next.stamp(false);
                tx.save(&R::table()?, next.to_row()?)?;
                return Ok(UpdateOutcome {
                    revision: next,
                    created: false,
                    new_revision: false,
                });
            }

            let mut previous = current;
            previous.set_currency(Currency::NonCurrent);
            tx.save(&R::table()?, previous.to_row()?)?;

            next.set_revision_id(id);
            next.set_currency(Currency::Current);
            next.stamp(true);
            tx.save(&R::table()?, next.to_row()?)?;

            if R::HAS_CONTENTS {
                let blob = if touched {
                    Blob::new(next.name(), next.content_type(), contents.unwrap_or_default().to_vec())?
                } else {
                    match tx.get(&Blob::table()?, &previous.key()?)? {
                        Some(row) => Blob {
                            mime_type: next.content_type().to_string(),
                            ..Blob::from_row(&row)?.copied_to(next.name())
                        },
                        None => Blob::new(next.name(), next.content_type(), Vec::new())?,
                    }
                };
                tx.save(&Blob::table()?, blob.to_row()?)?;
            }

            Ok(UpdateOutcome {
                revision: next,
                created: false,
                new_revision: true,
            })
        })?;

        tracing::info!(
            kind = kind::<R>(),
            name = %outcome.revision.name(),
            created = outcome.created,
            new_revision = outcome.new_revision,
            "updated revision"
        );
        Ok(outcome)
    }

    /// delete `name` with its artifacts, revisions, blobs and tags
    ///
    /// Each step commits on its own. A failed step leaves the later steps
    /// undone, and calling this again removes what is left.
    pub fn delete_cascade<R, S>(&self, store: &mut S, name: &R::Name) -> RevisionResult<()>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.validate()?;
        let revisions = Query {
            order: None,
            ..revision_query::<R>(name)?
        };
        let tags = tag_query::<R>(name)?;

        let remaining = store.run(&revisions)?.count() + store.run(&tags)?.count();
        if remaining == 0 {
            return Err(RevisionError::not_found(kind::<R>(), name));
        }

        let step = |step: &'static str| {
            let name = name.to_string();
            move |source: RevisionError| RevisionError::Cascade {
                name,
                step,
                source: Box::new(source),
            }
        };

        let mut filters = name.filters();
        filters.push(("parent_level", kind::<R>().to_string()));
        cascade::delete_artifacts(store, &filters).map_err(step("artifacts"))?;

        if R::HAS_CONTENTS {
            store
                .transaction(|tx| {
                    let keys: Vec<_> = tx.run(&revisions)?.map(|row| row.key).collect();
                    let blobs = Blob::table()?;
                    for key in keys {
                        tx.delete(&blobs, &key)?;
                    }
                    Ok::<_, RevisionError>(())
                })
                .map_err(step("blobs"))?;
        }

        let deleted = store
            .transaction(|tx| Ok::<_, RevisionError>(tx.delete_all_matching(&revisions)?))
            .map_err(step("revisions"))?;

        store
            .transaction(|tx| Ok::<_, RevisionError>(tx.delete_all_matching(&tags)?))
            .map_err(step("tags"))?;

        tracing::info!(kind = kind::<R>(), name = %name, revisions = deleted, "deleted");
        Ok(())
    }

    /// delete one revision; the newest remaining revision takes over if it was current
    pub fn delete_revision<R, S>(&self, store: &mut S, name: &RevisionName<R::Name>) -> RevisionResult<R>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.name.validate()?;
        let deleted = store.transaction(|tx| {
            let target = resolve::<R>(tx, name)?.ok_or_else(|| RevisionError::not_found("revision", name))?;

            let logical = &name.name;
            if tx.run(&revision_query::<R>(logical)?)?.count() <= 1 {
                return Err(RevisionError::InvalidArgument(format!(
                    "{} is the only revision of {}; delete the {} instead",
                    target.revision_id(),
                    logical,
                    kind::<R>()
                )));
            }

            tx.delete(&R::table()?, &target.key()?)?;
            if R::HAS_CONTENTS {
                tx.delete(&Blob::table()?, &target.key()?)?;
            }
            let tags = tag_query::<R>(logical)?.require("revision_id", target.revision_id());
            tx.delete_all_matching(&tags)?;

            if target.currency() == Currency::Current {
                if let Some(mut promoted) = self.latest::<R>(tx, logical, Currency::NonCurrent)? {
                    promoted.set_currency(Currency::Current);
                    tx.save(&R::table()?, promoted.to_row()?)?;
                }
            }
            Ok(target)
        })?;

        tracing::info!(kind = kind::<R>(), name = %deleted.name(), "deleted revision");
        Ok(deleted)
    }

    /// point `tag` at the revision `name` resolves to
    pub fn tag_revision<R, S>(&self, store: &mut S, name: &RevisionName<R::Name>, tag: &str) -> RevisionResult<R>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.name.validate()?;
        validate_id(tag)?;

        let tagged = store.transaction(|tx| {
            let revision = resolve::<R>(tx, name)?.ok_or_else(|| RevisionError::not_found("revision", name))?;

            let owner = name.name.to_string();
            let key = key_of(&RevisionTag::key_name(&owner, tag))?;
            let mut record = RevisionTag::new(owner, tag, revision.revision_id());
            if let Some(existing) = tx.get(&tag_table::<R>()?, &key)? {
                record.create_time = existing.to_model::<RevisionTag>()?.create_time;
            }
            tx.save(&tag_table::<R>()?, Row::from_model(key, &record)?)?;
            Ok::<_, RevisionError>(revision)
        })?;

        tracing::info!(kind = kind::<R>(), name = %tagged.name(), tag, "tagged revision");
        Ok(tagged)
    }

    /// make an earlier revision of `name` current again
    pub fn rollback<R, S>(&self, store: &mut S, name: &R::Name, revision: &str) -> RevisionResult<R>
    where
        R: Revisioned,
        S: TransactionalStore,
    {
        name.validate()?;
        let target_name = RevisionName::new(name.clone(), revision);

        let promoted = store.transaction(|tx| {
            let mut target =
                resolve::<R>(tx, &target_name)?.ok_or_else(|| RevisionError::not_found("revision", &target_name))?;
            if target.currency() == Currency::Current {
                return Ok(target);
            }

            if let Some(mut current) = self.latest::<R>(tx, name, Currency::Current)? {
                current.set_currency(Currency::NonCurrent);
                tx.save(&R::table()?, current.to_row()?)?;
            }

            target.set_currency(Currency::Current);
            target.stamp(true);
            tx.save(&R::table()?, target.to_row()?)?;
            Ok::<_, RevisionError>(target)
        })?;

        tracing::info!(kind = kind::<R>(), name = %promoted.name(), "rolled back");
        Ok(promoted)
    }
}

/// look up a revision by id, then by tag
fn resolve<R: Revisioned>(store: &mut dyn Store, name: &RevisionName<R::Name>) -> RevisionResult<Option<R>> {
    let table = R::table()?;
    if let Some(row) = store.get(&table, &key_of(name)?)? {
        return Ok(Some(R::from_row(&row)?));
    }

    let tag_key = key_of(&RevisionTag::key_name(&name.name.to_string(), &name.revision_id))?;
    let Some(tag_row) = store.get(&tag_table::<R>()?, &tag_key)? else {
        return Ok(None);
    };
    let tag: RevisionTag = tag_row.to_model()?;
    let target = RevisionName::new(name.name.clone(), tag.revision_id);
    match store.get(&table, &key_of(&target)?)? {
        Some(row) => Ok(Some(R::from_row(&row)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deployment, Spec};
    use crate::names::{DeploymentName, SpecName};
    use crate::storage::MemoryStore;

    fn store_with_version() -> MemoryStore {
        let mut store = MemoryStore::new();
        let version = Version::new(&"projects/p1/apis/a1/versions/v1".parse().unwrap(), &Version::default());
        store
            .save(&Version::table().unwrap(), version.to_row().unwrap())
            .unwrap();
        store
    }

    fn spec_name() -> SpecName {
        "projects/p1/apis/a1/versions/v1/specs/s1".parse().unwrap()
    }

    fn yaml() -> Spec {
        Spec {
            mime_type: "application/yaml".into(),
            ..Default::default()
        }
    }

    fn update(revisions: &RevisionStore, store: &mut MemoryStore, contents: &[u8]) -> UpdateOutcome<Spec> {
        revisions
            .update_current(store, &spec_name(), &Spec::default(), Some(contents), &FieldMask::default(), false)
            .unwrap()
    }

    #[test]
    fn test_create_requires_parent_and_rejects_duplicates() {
        let revisions = RevisionStore::default();
        let mut empty = MemoryStore::new();
        let err = revisions
            .create(&mut empty, &spec_name(), &yaml(), Some(&b"a"[..]))
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound { kind: "version", .. }));

        let mut store = store_with_version();
        let created = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"a"[..])).unwrap();
        assert_eq!(created.currency, Currency::Current);
        assert_eq!(created.revision_id.len(), 8);
        assert_eq!(store.row_count(&Blob::table().unwrap()), 1);

        let err = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"b"[..])).unwrap_err();
        assert!(matches!(err, RevisionError::AlreadyExists { .. }));
    }

    #[test]
    fn test_updates_keep_one_current_revision() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"v0"[..])).unwrap();

        let mut last = String::new();
        for i in 1..=3 {
            let outcome = update(&revisions, &mut store, format!("v{}", i).as_bytes());
            assert!(outcome.new_revision);
            last = outcome.revision.revision_id;
        }

        let all: Vec<Spec> = store
            .run(&revision_query::<Spec>(&spec_name()).unwrap())
            .unwrap()
            .map(|row| Spec::from_row(&row).unwrap())
            .collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all.iter().filter(|s| s.currency == Currency::Current).count(), 1);
        assert_eq!(all[0].revision_id, last);
        assert_eq!(all[0].currency, Currency::Current);

        let current: Spec = revisions.get_current(&mut store, &spec_name()).unwrap();
        assert_eq!(current.revision_id, last);
        let blob = revisions.contents(&mut store, &current).unwrap();
        assert_eq!(blob.contents, b"v3");
    }

    #[test]
    fn test_same_contents_updates_in_place() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        let created = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"same"[..])).unwrap();

        let body = Spec {
            description: "described".into(),
            ..Default::default()
        };
        let outcome = revisions
            .update_current(&mut store, &spec_name(), &body, Some(&b"same"[..]), &FieldMask::default(), false)
            .unwrap();
        assert!(!outcome.new_revision);
        assert_eq!(outcome.revision.revision_id, created.revision_id);
        assert_eq!(outcome.revision.description, "described");
        assert_eq!(store.row_count(&Spec::table().unwrap()), 1);
    }

    #[test]
    fn test_metadata_change_copies_blob() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"body"[..])).unwrap();

        let body = Spec {
            filename: "openapi.yaml".into(),
            ..Default::default()
        };
        let outcome = revisions
            .update_current(&mut store, &spec_name(), &body, None, &FieldMask::default(), false)
            .unwrap();
        assert!(outcome.new_revision);
        let blob = revisions.contents(&mut store, &outcome.revision).unwrap();
        assert_eq!(blob.contents, b"body");
        assert_eq!(store.row_count(&Blob::table().unwrap()), 2);
    }

    #[test]
    fn test_update_allow_missing_creates() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        let name: DeploymentName = "projects/p1/apis/a1/versions/v1/deployments/prod".parse().unwrap();
        let body = Deployment {
            endpoint_uri: "https://pets.example.com".into(),
            ..Default::default()
        };

        let err = revisions
            .update_current(&mut store, &name, &body, None, &FieldMask::default(), false)
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound { .. }));

        let outcome = revisions
            .update_current(&mut store, &name, &body, None, &FieldMask::default(), true)
            .unwrap();
        assert!(outcome.created);
        let fetched: Deployment = revisions.get_current(&mut store, &name).unwrap();
        assert_eq!(fetched, outcome.revision);
        assert_eq!(store.row_count(&Blob::table().unwrap()), 0);
    }

    #[test]
    fn test_lookup_strategies_agree() {
        let mut store = store_with_version();
        let trusting = RevisionStore::new(RevisionLookup::TrustStoreOrder);
        let resorting = RevisionStore::new(RevisionLookup::ResortClientSide);

        trusting.create(&mut store, &spec_name(), &yaml(), Some(&b"1"[..])).unwrap();
        update(&trusting, &mut store, b"2");
        update(&trusting, &mut store, b"3");

        for status in [Currency::Current, Currency::NonCurrent] {
            let a: Spec = trusting.latest(&mut store, &spec_name(), status).unwrap().unwrap();
            let b: Spec = resorting.latest(&mut store, &spec_name(), status).unwrap().unwrap();
            assert_eq!(a.revision_id, b.revision_id);
        }
    }

    #[test]
    fn test_tags_resolve_and_follow_moves() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        let first = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"1"[..])).unwrap();
        let second = update(&revisions, &mut store, b"2").revision;

        let tagged = RevisionName::new(spec_name(), first.revision_id.clone());
        revisions.tag_revision::<Spec, _>(&mut store, &tagged, "stable").unwrap();

        let by_tag: Spec = revisions
            .get_revision(&mut store, &RevisionName::new(spec_name(), "stable"))
            .unwrap();
        assert_eq!(by_tag.revision_id, first.revision_id);
        assert_eq!(by_tag.currency, Currency::NonCurrent);

        let moved = RevisionName::new(spec_name(), second.revision_id.clone());
        revisions.tag_revision::<Spec, _>(&mut store, &moved, "stable").unwrap();
        let by_tag: Spec = revisions
            .get_revision(&mut store, &RevisionName::new(spec_name(), "stable"))
            .unwrap();
        assert_eq!(by_tag.revision_id, second.revision_id);

        assert!(revisions
            .tag_revision::<Spec, _>(&mut store, &moved, "Not Valid")
            .is_err());
    }

    #[test]
    fn test_delete_current_revision_promotes_previous() {
        let revisions = RevisionStore::new(RevisionLookup::ResortClientSide);
        let mut store = store_with_version();
        let first = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"1"[..])).unwrap();
        let second = update(&revisions, &mut store, b"2").revision;

        let deleted: Spec = revisions
            .delete_revision(&mut store, &second.revision_name())
            .unwrap();
        assert_eq!(deleted.revision_id, second.revision_id);

        let current: Spec = revisions.get_current(&mut store, &spec_name()).unwrap();
        assert_eq!(current.revision_id, first.revision_id);

        let err = revisions
            .delete_revision::<Spec, _>(&mut store, &first.revision_name())
            .unwrap_err();
        assert!(matches!(err, RevisionError::InvalidArgument(_)));
    }

    #[test]
    fn test_rollback_promotes_older_revision() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        let first = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"1"[..])).unwrap();
        update(&revisions, &mut store, b"2");

        let rolled: Spec = revisions
            .rollback(&mut store, &spec_name(), &first.revision_id)
            .unwrap();
        assert_eq!(rolled.revision_id, first.revision_id);
        assert!(rolled.revision_create_time > first.revision_create_time);

        let current: Spec = revisions.get_current(&mut store, &spec_name()).unwrap();
        assert_eq!(current.revision_id, first.revision_id);
    }

    #[test]
    fn test_delete_cascade_removes_everything_and_is_repeatable() {
        let revisions = RevisionStore::default();
        let mut store = store_with_version();
        let first = revisions.create(&mut store, &spec_name(), &yaml(), Some(&b"1"[..])).unwrap();
        update(&revisions, &mut store, b"2");
        revisions
            .tag_revision::<Spec, _>(&mut store, &first.revision_name(), "v1")
            .unwrap();

        revisions.delete_cascade::<Spec, _>(&mut store, &spec_name()).unwrap();

        assert_eq!(store.row_count(&Spec::table().unwrap()), 0);
        assert_eq!(store.row_count(&Blob::table().unwrap()), 0);
        assert_eq!(store.row_count(&TableName::new(Spec::TAG_TABLE).unwrap()), 0);

        let err = revisions
            .delete_cascade::<Spec, _>(&mut store, &spec_name())
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound { .. }));
    }
}
