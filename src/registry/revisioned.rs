//! Operations shared by specs and deployments.

use crate::filter::Schema;
use crate::models::Currency;
use crate::names::{ResourceName, RevisionName, VersionName, WILDCARD};
use crate::notify::ChangeKind;
use crate::revisions::{revision_query, Revisioned};
use crate::storage::{Query, Store};

use super::error::{RegistryError, RegistryResult};
use super::list::{list_page, select};
use super::messages::{ListRequest, ListResponse, UpdateOptions};
use super::{Backend, Registry};

/// what a read of a revisioned name addresses
enum Target<N> {
    /// the current revision
    Current(N),
    /// one revision, by id or tag
    Revision(RevisionName<N>),
}

impl<N: ResourceName> Target<N> {
    fn parse(name: &str) -> RegistryResult<Self> {
        let target = if name.contains('@') {
            let revision: RevisionName<N> = name.parse()?;
            revision.validate()?;
            Target::Revision(revision)
        } else {
            let logical: N = name.parse()?;
            logical.validate()?;
            Target::Current(logical)
        };
        Ok(target)
    }
}

fn parse_logical<N: ResourceName>(name: &str) -> RegistryResult<N> {
    let name: N = name.parse()?;
    name.validate()?;
    Ok(name)
}

impl<B: Backend> Registry<B> {
    pub(super) fn create_revisioned<R: Revisioned>(
        &self,
        name: &R::Name,
        body: &R,
        contents: Option<&[u8]>,
    ) -> RegistryResult<R> {
        let mut conn = self.connect()?;
        let created = self.revisions.create(&mut conn, name, body, contents)?;
        self.notify(ChangeKind::Created, created.name());
        Ok(created)
    }

    pub(super) fn get_revisioned<R: Revisioned>(&self, name: &str) -> RegistryResult<R> {
        let target = Target::<R::Name>::parse(name)?;
        let mut conn = self.connect()?;
        let revision = match &target {
            Target::Current(name) => self.revisions.get_current::<R>(&mut conn, name)?,
            Target::Revision(name) => self.revisions.get_revision::<R>(&mut conn, name)?,
        };
        Ok(revision)
    }

    /// current revisions under `parent`; ids in `parent` may be `-`
    pub(super) fn list_current<R: Revisioned>(
        &self,
        parent: &str,
        schema: &Schema,
        request: &ListRequest,
    ) -> RegistryResult<ListResponse<R>> {
        let parent: VersionName = parent.parse()?;
        let mut conn = self.connect()?;
        self.require_concrete_prefix(&mut conn, &parent.ids())?;
        let query = select(Query::new(R::table()?), parent.filters()).require("currency", Currency::Current.as_str());
        list_page(&mut conn, query, schema, request, &self.config)
    }

    /// every revision of `name`, newest first
    ///
    /// `name` may carry the revision collection suffix `@-`
    pub(super) fn list_revisions<R: Revisioned>(
        &self,
        name: &str,
        schema: &Schema,
        request: &ListRequest,
    ) -> RegistryResult<ListResponse<R>> {
        let logical = name.strip_suffix(&format!("@{}", WILDCARD)).unwrap_or(name);
        let logical: R::Name = logical.parse()?;
        let query = revision_query::<R>(&logical)?;
        let mut conn = self.connect()?;
        if logical.has_wildcards() {
            self.require_concrete_prefix(&mut conn, &logical.ids())?;
        } else if conn.run(&query)?.next().is_none() {
            return Err(RegistryError::not_found(<R::Name as ResourceName>::KIND, &logical));
        }
        list_page(&mut conn, query, schema, request, &self.config)
    }

    pub(super) fn update_revisioned<R: Revisioned>(
        &self,
        name: &str,
        body: &R,
        contents: Option<&[u8]>,
        options: &UpdateOptions,
    ) -> RegistryResult<R> {
        let name = parse_logical::<R::Name>(name)?;
        let mut conn = self.connect()?;
        let outcome = self.revisions.update_current(
            &mut conn,
            &name,
            body,
            contents,
            &options.mask,
            options.allow_missing,
        )?;
        let kind = if outcome.created {
            ChangeKind::Created
        } else {
            ChangeKind::Updated
        };
        self.notify(kind, outcome.revision.name());
        Ok(outcome.revision)
    }

    pub(super) fn delete_revisioned<R: Revisioned>(&self, name: &str) -> RegistryResult<()> {
        let name = parse_logical::<R::Name>(name)?;
        let mut conn = self.connect()?;
        self.revisions.delete_cascade::<R, _>(&mut conn, &name)?;
        self.notify(ChangeKind::Deleted, name.to_string());
        Ok(())
    }

    pub(super) fn delete_one_revision<R: Revisioned>(&self, name: &str) -> RegistryResult<R> {
        let name: RevisionName<R::Name> = name.parse()?;
        name.validate()?;
        let mut conn = self.connect()?;
        let deleted = self.revisions.delete_revision::<R, _>(&mut conn, &name)?;
        self.notify(ChangeKind::Deleted, deleted.name());
        Ok(deleted)
    }

    pub(super) fn tag_revisioned<R: Revisioned>(&self, name: &str, tag: &str) -> RegistryResult<R> {
        let name: RevisionName<R::Name> = name.parse()?;
        name.validate()?;
        let mut conn = self.connect()?;
        let tagged = self.revisions.tag_revision::<R, _>(&mut conn, &name, tag)?;
        self.notify(ChangeKind::Updated, RevisionName::new(name.name, tag).to_string());
        Ok(tagged)
    }

    pub(super) fn rollback_revisioned<R: Revisioned>(&self, name: &str, revision_id: &str) -> RegistryResult<R> {
        let name = parse_logical::<R::Name>(name)?;
        let mut conn = self.connect()?;
        let promoted = self.revisions.rollback::<R, _>(&mut conn, &name, revision_id)?;
        self.notify(ChangeKind::Updated, promoted.name());
        Ok(promoted)
    }
}
