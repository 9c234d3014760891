//! Projects, apis and versions.
//!
//! These kinds have no revision history: one row per resource, updated in
//! place. Deleting one removes everything below it, innermost first, and
//! the resource's own row last so an interrupted delete can be repeated.

use crate::models::{key_of, Api, Deployment, FieldMask, MaskError, Model, Project, Spec, Version};
use crate::names::{generate_id, ApiName, ProjectName, ResourceName, VersionName, WILDCARD};
use crate::notify::ChangeKind;
use crate::revisions::{cascade, RevisionError};
use crate::storage::{Query, StorageError, Store, TableName, TransactionalStore};

use super::error::{RegistryError, RegistryResult};
use super::list::{list_page, select};
use super::messages::{ListRequest, ListResponse, UpdateOptions};
use super::{schemas, Backend, Registry};

/// the resource a container lives in
struct Owner {
    kind: &'static str,
    table: &'static str,
    name: String,
}

/// A kind stored as a single row without revisions.
trait Container: Model + Clone {
    type Name: ResourceName;

    fn build(name: &Self::Name, body: &Self) -> Self;

    fn apply(&mut self, body: &Self, mask: &FieldMask) -> Result<(), MaskError>;

    fn owner(name: &Self::Name) -> Option<Owner>;
}

impl Container for Project {
    type Name = ProjectName;

    fn build(name: &ProjectName, body: &Project) -> Self {
        Project::new(name, body)
    }

    fn apply(&mut self, body: &Project, mask: &FieldMask) -> Result<(), MaskError> {
        self.update(body, mask)
    }

    fn owner(_: &ProjectName) -> Option<Owner> {
        None
    }
}

impl Container for Api {
    type Name = ApiName;

    fn build(name: &ApiName, body: &Api) -> Self {
        Api::new(name, body)
    }

    fn apply(&mut self, body: &Api, mask: &FieldMask) -> Result<(), MaskError> {
        self.update(body, mask)
    }

    fn owner(name: &ApiName) -> Option<Owner> {
        Some(Owner {
            kind: ProjectName::KIND,
            table: Project::TABLE,
            name: name.parent().to_string(),
        })
    }
}

impl Container for Version {
    type Name = VersionName;

    fn build(name: &VersionName, body: &Version) -> Self {
        Version::new(name, body)
    }

    fn apply(&mut self, body: &Version, mask: &FieldMask) -> Result<(), MaskError> {
        self.update(body, mask)
    }

    fn owner(name: &VersionName) -> Option<Owner> {
        Some(Owner {
            kind: ApiName::KIND,
            table: Api::TABLE,
            name: name.parent().to_string(),
        })
    }
}

fn require_owner<M: Container>(tx: &mut dyn Store, name: &M::Name) -> RegistryResult<()> {
    if let Some(owner) = M::owner(name) {
        let table = TableName::new(owner.table).map_err(StorageError::from)?;
        if tx.get(&table, &key_of(&owner.name)?)?.is_none() {
            return Err(RegistryError::not_found(owner.kind, owner.name));
        }
    }
    Ok(())
}

fn insert<M: Container>(tx: &mut dyn Store, name: &M::Name, body: &M) -> RegistryResult<M> {
    require_owner::<M>(tx, name)?;
    let model = M::build(name, body);
    let (table, key) = (M::table()?, model.key()?);
    if tx.get(&table, &key)?.is_some() {
        return Err(RegistryError::already_exists(<M::Name as ResourceName>::KIND, name));
    }
    tx.save(&table, model.to_row()?)?;
    Ok(model)
}

fn fetch<M: Container>(store: &mut dyn Store, name: &M::Name) -> RegistryResult<Option<M>> {
    match store.get(&M::table()?, &key_of(name)?)? {
        Some(row) => Ok(Some(M::from_row(&row)?)),
        None => Ok(None),
    }
}

fn ignore_missing(result: Result<(), RevisionError>) -> RegistryResult<()> {
    match result {
        Err(RevisionError::NotFound { .. }) | Ok(()) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// id to create under: the caller's, or a generated one
pub(super) fn chosen_id(id: &str) -> String {
    if id.is_empty() {
        generate_id()
    } else {
        id.to_string()
    }
}

impl<B: Backend> Registry<B> {
    fn create_container<M: Container>(&self, name: &M::Name, body: &M) -> RegistryResult<M> {
        name.validate()?;
        let mut conn = self.connect()?;
        let created = conn.transaction(|tx| insert::<M>(tx, name, body))?;
        tracing::info!(name = %name, "created");
        self.notify(ChangeKind::Created, name.to_string());
        Ok(created)
    }

    fn get_container<M: Container>(&self, name: &M::Name) -> RegistryResult<M> {
        name.validate()?;
        let mut conn = self.connect()?;
        fetch::<M>(&mut conn, name)?.ok_or_else(|| RegistryError::not_found(<M::Name as ResourceName>::KIND, name))
    }

    fn update_container<M: Container>(&self, name: &M::Name, body: &M, options: &UpdateOptions) -> RegistryResult<M> {
        name.validate()?;
        let mut conn = self.connect()?;
        let (model, created) = conn.transaction(|tx| -> RegistryResult<(M, bool)> {
            match fetch::<M>(tx, name)? {
                Some(mut model) => {
                    model.apply(body, &options.mask)?;
                    tx.save(&M::table()?, model.to_row()?)?;
                    Ok((model, false))
                }
                None if options.allow_missing => Ok((insert::<M>(tx, name, body)?, true)),
                None => Err(RegistryError::not_found(<M::Name as ResourceName>::KIND, name)),
            }
        })?;
        tracing::info!(name = %name, created, "updated");
        let kind = if created { ChangeKind::Created } else { ChangeKind::Updated };
        self.notify(kind, name.to_string());
        Ok(model)
    }

    fn list_containers<M: Container>(
        &self,
        parent: Vec<(&'static str, String)>,
        schema: crate::filter::Schema,
        request: &ListRequest,
    ) -> RegistryResult<ListResponse<M>> {
        let mut conn = self.connect()?;
        let query = select(Query::new(M::table()?), parent);
        list_page(&mut conn, query, &schema, request, &self.config)
    }

    /// remove every spec, deployment and artifact selected by `filters`
    fn delete_descendants<S: TransactionalStore>(
        &self,
        conn: &mut S,
        filters: &[(&'static str, String)],
    ) -> RegistryResult<()> {
        for spec in cascade::children::<Spec, _>(conn, filters)? {
            ignore_missing(self.revisions.delete_cascade::<Spec, _>(conn, &spec))?;
        }
        for deployment in cascade::children::<Deployment, _>(conn, filters)? {
            ignore_missing(self.revisions.delete_cascade::<Deployment, _>(conn, &deployment))?;
        }
        let artifacts = cascade::delete_artifacts(conn, filters)?;
        tracing::debug!(artifacts, "deleted descendants");
        Ok(())
    }

    fn delete_container_row<M: Container, S: TransactionalStore>(
        &self,
        conn: &mut S,
        name: &M::Name,
    ) -> RegistryResult<()> {
        let (table, key) = (M::table()?, key_of(name)?);
        conn.transaction(|tx| Ok::<_, RegistryError>(tx.delete(&table, &key)?))?;
        tracing::info!(name = %name, "deleted");
        self.notify(ChangeKind::Deleted, name.to_string());
        Ok(())
    }

    fn require_container<M: Container>(&self, store: &mut dyn Store, name: &M::Name) -> RegistryResult<()> {
        match fetch::<M>(store, name)? {
            Some(_) => Ok(()),
            None => Err(RegistryError::not_found(<M::Name as ResourceName>::KIND, name)),
        }
    }

    pub(super) fn require_project(&self, store: &mut dyn Store, name: &ProjectName) -> RegistryResult<()> {
        self.require_container::<Project>(store, name)
    }

    pub(super) fn require_api(&self, store: &mut dyn Store, name: &ApiName) -> RegistryResult<()> {
        self.require_container::<Api>(store, name)
    }

    pub(super) fn require_version(&self, store: &mut dyn Store, name: &VersionName) -> RegistryResult<()> {
        self.require_container::<Version>(store, name)
    }

    /// require the deepest container named by the wildcard-free prefix of `ids`
    ///
    /// `projects/p1/apis/-/versions/-` checks the project; a leading
    /// wildcard checks nothing
    pub(super) fn require_concrete_prefix(
        &self,
        store: &mut dyn Store,
        ids: &[(&'static str, &str)],
    ) -> RegistryResult<()> {
        let concrete: Vec<&str> = ids
            .iter()
            .map(|(_, id)| *id)
            .take_while(|id| *id != WILDCARD)
            .collect();
        match concrete.as_slice() {
            [] => Ok(()),
            [project] => self.require_project(store, &ProjectName::new(*project)),
            [project, api] => self.require_api(store, &ProjectName::new(*project).api(*api)),
            [project, api, version, ..] => {
                self.require_version(store, &ProjectName::new(*project).api(*api).version(*version))
            }
        }
    }

    pub fn create_project(&self, project_id: &str, body: &Project) -> RegistryResult<Project> {
        let name = ProjectName::new(chosen_id(project_id));
        let _span = crate::logging::operation_span("create_project", &name.to_string()).entered();
        self.create_container(&name, body)
    }

    pub fn get_project(&self, name: &str) -> RegistryResult<Project> {
        let _span = crate::logging::operation_span("get_project", name).entered();
        self.get_container(&name.parse::<ProjectName>()?)
    }

    pub fn list_projects(&self, request: &ListRequest) -> RegistryResult<ListResponse<Project>> {
        let _span = crate::logging::operation_span("list_projects", "").entered();
        self.list_containers(Vec::new(), schemas::projects(), request)
    }

    pub fn update_project(&self, name: &str, body: &Project, options: &UpdateOptions) -> RegistryResult<Project> {
        let _span = crate::logging::operation_span("update_project", name).entered();
        self.update_container(&name.parse::<ProjectName>()?, body, options)
    }

    pub fn delete_project(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_project", name).entered();
        let name: ProjectName = name.parse()?;
        name.validate()?;
        let mut conn = self.connect()?;
        self.require_container::<Project>(&mut conn, &name)?;

        let filters = name.filters();
        self.delete_descendants(&mut conn, &filters)?;
        cascade::delete_rows::<Version, _>(&mut conn, &filters)?;
        cascade::delete_rows::<Api, _>(&mut conn, &filters)?;
        self.delete_container_row::<Project, _>(&mut conn, &name)
    }

    pub fn create_api(&self, parent: &str, api_id: &str, body: &Api) -> RegistryResult<Api> {
        let name = parent.parse::<ProjectName>()?.api(chosen_id(api_id));
        let _span = crate::logging::operation_span("create_api", &name.to_string()).entered();
        self.create_container(&name, body)
    }

    pub fn get_api(&self, name: &str) -> RegistryResult<Api> {
        let _span = crate::logging::operation_span("get_api", name).entered();
        self.get_container(&name.parse::<ApiName>()?)
    }

    /// apis of `request.parent`; the project id may be `-`
    pub fn list_apis(&self, request: &ListRequest) -> RegistryResult<ListResponse<Api>> {
        let _span = crate::logging::operation_span("list_apis", &request.parent).entered();
        let parent: ProjectName = request.parent.parse()?;
        self.require_concrete_prefix(&mut self.connect()?, &parent.ids())?;
        self.list_containers(parent.filters(), schemas::apis(), request)
    }

    pub fn update_api(&self, name: &str, body: &Api, options: &UpdateOptions) -> RegistryResult<Api> {
        let _span = crate::logging::operation_span("update_api", name).entered();
        self.update_container(&name.parse::<ApiName>()?, body, options)
    }

    pub fn delete_api(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_api", name).entered();
        let name: ApiName = name.parse()?;
        name.validate()?;
        let mut conn = self.connect()?;
        self.require_container::<Api>(&mut conn, &name)?;

        let filters = name.filters();
        self.delete_descendants(&mut conn, &filters)?;
        cascade::delete_rows::<Version, _>(&mut conn, &filters)?;
        self.delete_container_row::<Api, _>(&mut conn, &name)
    }

    pub fn create_api_version(&self, parent: &str, version_id: &str, body: &Version) -> RegistryResult<Version> {
        let name = parent.parse::<ApiName>()?.version(chosen_id(version_id));
        let _span = crate::logging::operation_span("create_api_version", &name.to_string()).entered();
        self.create_container(&name, body)
    }

    pub fn get_api_version(&self, name: &str) -> RegistryResult<Version> {
        let _span = crate::logging::operation_span("get_api_version", name).entered();
        self.get_container(&name.parse::<VersionName>()?)
    }

    /// versions of `request.parent`; any id may be `-`
    pub fn list_api_versions(&self, request: &ListRequest) -> RegistryResult<ListResponse<Version>> {
        let _span = crate::logging::operation_span("list_api_versions", &request.parent).entered();
        let parent: ApiName = request.parent.parse()?;
        self.require_concrete_prefix(&mut self.connect()?, &parent.ids())?;
        self.list_containers(parent.filters(), schemas::versions(), request)
    }

    pub fn update_api_version(&self, name: &str, body: &Version, options: &UpdateOptions) -> RegistryResult<Version> {
        let _span = crate::logging::operation_span("update_api_version", name).entered();
        self.update_container(&name.parse::<VersionName>()?, body, options)
    }

    /// delete a version with its specs, deployments and artifacts
    pub fn delete_api_version(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_api_version", name).entered();
        let name: VersionName = name.parse()?;
        name.validate()?;
        let mut conn = self.connect()?;
        self.require_container::<Version>(&mut conn, &name)?;

        self.delete_descendants(&mut conn, &name.filters())?;
        self.delete_container_row::<Version, _>(&mut conn, &name)
    }
}
