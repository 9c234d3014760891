//! Deployment operations.
//!
//! Deployments follow the same revision rules as specs but store no
//! contents; a new revision is cut when the spec revision or the endpoint
//! changes.

use crate::models::Deployment;
use crate::names::VersionName;

use super::containers::chosen_id;
use super::error::RegistryResult;
use super::messages::{ListRequest, ListResponse, UpdateOptions};
use super::{schemas, Backend, Registry};

impl<B: Backend> Registry<B> {
    pub fn create_api_deployment(
        &self,
        parent: &str,
        deployment_id: &str,
        body: &Deployment,
    ) -> RegistryResult<Deployment> {
        let name = parent.parse::<VersionName>()?.deployment(chosen_id(deployment_id));
        let _span = crate::logging::operation_span("create_api_deployment", &name.to_string()).entered();
        self.create_revisioned(&name, body, None)
    }

    /// the current revision, or the one named by `{deployment}@{revision}`
    pub fn get_api_deployment(&self, name: &str) -> RegistryResult<Deployment> {
        let _span = crate::logging::operation_span("get_api_deployment", name).entered();
        self.get_revisioned(name)
    }

    pub fn list_api_deployments(&self, request: &ListRequest) -> RegistryResult<ListResponse<Deployment>> {
        let _span = crate::logging::operation_span("list_api_deployments", &request.parent).entered();
        self.list_current(&request.parent, &schemas::deployments(), request)
    }

    pub fn list_api_deployment_revisions(&self, request: &ListRequest) -> RegistryResult<ListResponse<Deployment>> {
        let _span = crate::logging::operation_span("list_api_deployment_revisions", &request.parent).entered();
        self.list_revisions(&request.parent, &schemas::deployments(), request)
    }

    pub fn update_api_deployment(
        &self,
        name: &str,
        body: &Deployment,
        options: &UpdateOptions,
    ) -> RegistryResult<Deployment> {
        let _span = crate::logging::operation_span("update_api_deployment", name).entered();
        self.update_revisioned(name, body, None, options)
    }

    pub fn delete_api_deployment(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_api_deployment", name).entered();
        self.delete_revisioned::<Deployment>(name)
    }

    pub fn delete_api_deployment_revision(&self, name: &str) -> RegistryResult<Deployment> {
        let _span = crate::logging::operation_span("delete_api_deployment_revision", name).entered();
        self.delete_one_revision(name)
    }

    pub fn tag_api_deployment_revision(&self, name: &str, tag: &str) -> RegistryResult<Deployment> {
        let _span = crate::logging::operation_span("tag_api_deployment_revision", name).entered();
        self.tag_revisioned(name, tag)
    }

    pub fn rollback_api_deployment(&self, name: &str, revision_id: &str) -> RegistryResult<Deployment> {
        let _span = crate::logging::operation_span("rollback_api_deployment", name).entered();
        self.rollback_revisioned(name, revision_id)
    }
}
