//! Spec operations.
//!
//! Reads take either a spec name, which resolves to the current revision,
//! or `{spec}@{revision}` where the revision is an id or a tag.

use crate::models::Spec;
use crate::names::{SpecName, VersionName};
use crate::storage::Store;

use super::containers::chosen_id;
use super::error::RegistryResult;
use super::messages::{ApiSpec, Contents, ListRequest, ListResponse, UpdateOptions, View};
use super::{schemas, Backend, Registry};

impl<B: Backend> Registry<B> {
    /// create a spec under the version `parent`
    ///
    /// an empty `spec_id` gets a generated id
    pub fn create_api_spec(
        &self,
        parent: &str,
        spec_id: &str,
        body: &Spec,
        contents: Option<&[u8]>,
    ) -> RegistryResult<Spec> {
        let parent: VersionName = parent.parse()?;
        let name: SpecName = parent.spec(chosen_id(spec_id));
        let _span = crate::logging::operation_span("create_api_spec", &name.to_string()).entered();
        self.create_revisioned(&name, body, contents)
    }

    fn with_view(&self, store: &mut dyn Store, spec: Spec, view: View) -> RegistryResult<ApiSpec> {
        let contents = match view {
            View::Basic => None,
            View::Full => Some(self.revisions.contents(store, &spec)?.contents),
        };
        Ok(ApiSpec { spec, contents })
    }

    fn page_with_view(&self, page: ListResponse<Spec>, view: View) -> RegistryResult<ListResponse<ApiSpec>> {
        let mut conn = self.connect()?;
        let items = page
            .items
            .into_iter()
            .map(|spec| self.with_view(&mut conn, spec, view))
            .collect::<RegistryResult<Vec<_>>>()?;
        Ok(ListResponse {
            items,
            next_page_token: page.next_page_token,
        })
    }

    pub fn get_api_spec(&self, name: &str, view: View) -> RegistryResult<ApiSpec> {
        let _span = crate::logging::operation_span("get_api_spec", name).entered();
        let spec: Spec = self.get_revisioned(name)?;
        let mut conn = self.connect()?;
        self.with_view(&mut conn, spec, view)
    }

    /// contents of a spec revision, gunzipped when stored compressed
    pub fn get_api_spec_contents(&self, name: &str) -> RegistryResult<Contents> {
        let _span = crate::logging::operation_span("get_api_spec_contents", name).entered();
        let spec: Spec = self.get_revisioned(name)?;
        let mut conn = self.connect()?;
        Contents::from_blob(self.revisions.contents(&mut conn, &spec)?)
    }

    /// current revisions of the specs in `request.parent`
    ///
    /// contents are included when `request.view` is [`View::Full`]
    pub fn list_api_specs(&self, request: &ListRequest) -> RegistryResult<ListResponse<ApiSpec>> {
        let _span = crate::logging::operation_span("list_api_specs", &request.parent).entered();
        let page = self.list_current(&request.parent, &schemas::specs(), request)?;
        self.page_with_view(page, request.view)
    }

    /// every revision of the spec `request.parent`, newest first
    pub fn list_api_spec_revisions(&self, request: &ListRequest) -> RegistryResult<ListResponse<ApiSpec>> {
        let _span = crate::logging::operation_span("list_api_spec_revisions", &request.parent).entered();
        let page = self.list_revisions(&request.parent, &schemas::specs(), request)?;
        self.page_with_view(page, request.view)
    }

    /// update the current revision of `name`
    ///
    /// Changing the contents, mime type, filename or source uri creates a
    /// new revision; other fields change in place.
    pub fn update_api_spec(
        &self,
        name: &str,
        body: &Spec,
        contents: Option<&[u8]>,
        options: &UpdateOptions,
    ) -> RegistryResult<Spec> {
        let _span = crate::logging::operation_span("update_api_spec", name).entered();
        self.update_revisioned(name, body, contents, options)
    }

    /// delete a spec with all of its revisions, tags and artifacts
    pub fn delete_api_spec(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_api_spec", name).entered();
        self.delete_revisioned::<Spec>(name)
    }

    pub fn delete_api_spec_revision(&self, name: &str) -> RegistryResult<Spec> {
        let _span = crate::logging::operation_span("delete_api_spec_revision", name).entered();
        self.delete_one_revision(name)
    }

    pub fn tag_api_spec_revision(&self, name: &str, tag: &str) -> RegistryResult<Spec> {
        let _span = crate::logging::operation_span("tag_api_spec_revision", name).entered();
        self.tag_revisioned(name, tag)
    }

    pub fn rollback_api_spec(&self, name: &str, revision_id: &str) -> RegistryResult<Spec> {
        let _span = crate::logging::operation_span("rollback_api_spec", name).entered();
        self.rollback_revisioned(name, revision_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Api, Currency, FieldMask, Project, Spec, Version};
    use crate::registry::{Code, ListRequest, Registry, RegistryConfig, UpdateOptions, View};
    use crate::storage::MemoryStore;

    const VERSION: &str = "projects/p1/apis/a1/versions/v1";
    const SPEC: &str = "projects/p1/apis/a1/versions/v1/specs/openapi";

    fn registry() -> Registry<MemoryStore> {
        let registry = Registry::in_memory(RegistryConfig::default());
        registry.create_project("p1", &Project::default()).unwrap();
        registry.create_api("projects/p1", "a1", &Api::default()).unwrap();
        registry.create_api_version("projects/p1/apis/a1", "v1", &Version::default()).unwrap();
        registry
    }

    fn yaml() -> Spec {
        Spec {
            mime_type: "application/x.openapi+yaml".into(),
            filename: "openapi.yaml".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_read_back() {
        let registry = registry();
        let created = registry
            .create_api_spec(VERSION, "openapi", &yaml(), Some(&b"openapi: 3.0.0"[..]))
            .unwrap();
        assert_eq!(created.spec_id, "openapi");
        assert_eq!(created.size_bytes, 14);

        let basic = registry.get_api_spec(SPEC, View::Basic).unwrap();
        assert_eq!(basic.spec, created);
        assert!(basic.contents.is_none());

        let full = registry
            .get_api_spec(&format!("{}@{}", SPEC, created.revision_id), View::Full)
            .unwrap();
        assert_eq!(full.contents.as_deref(), Some(&b"openapi: 3.0.0"[..]));

        let contents = registry.get_api_spec_contents(SPEC).unwrap();
        assert_eq!(contents.mime_type, "application/x.openapi+yaml");
    }

    #[test]
    fn test_revision_history_and_rollback() {
        let registry = registry();
        let first = registry
            .create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..]))
            .unwrap();
        let second = registry
            .update_api_spec(SPEC, &Spec::default(), Some(&b"v1"[..]), &UpdateOptions::default())
            .unwrap();
        assert_ne!(first.revision_id, second.revision_id);

        let revisions = registry
            .list_api_spec_revisions(&ListRequest::new(format!("{}@-", SPEC)))
            .unwrap();
        let ids: Vec<_> = revisions.items.iter().map(|s| s.spec.revision_id.clone()).collect();
        assert_eq!(ids, vec![second.revision_id.clone(), first.revision_id.clone()]);

        let current = registry.list_api_specs(&ListRequest::new(VERSION)).unwrap();
        assert_eq!(current.items.len(), 1);
        assert_eq!(current.items[0].spec.revision_id, second.revision_id);
        assert_eq!(current.items[0].contents, None);

        let restored = registry.rollback_api_spec(SPEC, &first.revision_id).unwrap();
        assert_eq!(restored.revision_id, first.revision_id);
        assert_eq!(restored.currency, Currency::Current);
        let contents = registry.get_api_spec_contents(SPEC).unwrap();
        assert_eq!(contents.data, b"v0");
    }

    #[test]
    fn test_metadata_update_keeps_revision() {
        let registry = registry();
        let created = registry.create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..])).unwrap();
        let body = Spec {
            description: "the petstore".into(),
            ..Default::default()
        };
        let updated = registry
            .update_api_spec(
                SPEC,
                &body,
                None,
                &UpdateOptions::default().mask(FieldMask::new(["description"])),
            )
            .unwrap();
        assert_eq!(updated.revision_id, created.revision_id);
        assert_eq!(updated.description, "the petstore");
        assert_eq!(updated.size_bytes, 2);
    }

    #[test]
    fn test_tags_address_revisions() {
        let registry = registry();
        let first = registry.create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..])).unwrap();
        registry
            .update_api_spec(SPEC, &Spec::default(), Some(&b"v1"[..]), &UpdateOptions::default())
            .unwrap();

        registry
            .tag_api_spec_revision(&format!("{}@{}", SPEC, first.revision_id), "stable")
            .unwrap();
        let tagged = registry.get_api_spec(&format!("{}@stable", SPEC), View::Full).unwrap();
        assert_eq!(tagged.spec.revision_id, first.revision_id);
        assert_eq!(tagged.contents.as_deref(), Some(&b"v0"[..]));
    }

    #[test]
    fn test_delete_revision_and_spec() {
        let registry = registry();
        let first = registry.create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..])).unwrap();
        let only = format!("{}@{}", SPEC, first.revision_id);
        let err = registry.delete_api_spec_revision(&only).unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let second = registry
            .update_api_spec(SPEC, &Spec::default(), Some(&b"v1"[..]), &UpdateOptions::default())
            .unwrap();
        registry
            .delete_api_spec_revision(&format!("{}@{}", SPEC, second.revision_id))
            .unwrap();
        assert_eq!(
            registry.get_api_spec(SPEC, View::Basic).unwrap().spec.revision_id,
            first.revision_id
        );

        registry.delete_api_spec(SPEC).unwrap();
        assert!(registry.get_api_spec(SPEC, View::Basic).unwrap_err().is_not_found());
        assert!(registry.delete_api_spec(SPEC).unwrap_err().is_not_found());
    }

    #[test]
    fn test_parent_must_exist() {
        let registry = registry();
        let err = registry
            .create_api_spec("projects/p1/apis/a1/versions/v9", "s", &yaml(), None)
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let err = registry.list_api_specs(&ListRequest::new("projects/p1/apis/a1/versions/v9")).unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn test_wildcard_listing_checks_named_ancestors() {
        let registry = registry();
        for parent in ["projects/nope/apis/-/versions/-", "projects/p1/apis/nope/versions/-"] {
            let err = registry.list_api_specs(&ListRequest::new(parent)).unwrap_err();
            assert_eq!(err.code(), Code::NotFound, "{}", parent);
        }
        let err = registry
            .list_api_spec_revisions(&ListRequest::new("projects/p1/apis/nope/versions/-/specs/-"))
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let none = registry
            .list_api_specs(&ListRequest::new("projects/-/apis/nope/versions/-"))
            .unwrap();
        assert!(none.items.is_empty());
    }

    #[test]
    fn test_name_filter_uses_spec_name() {
        let registry = registry();
        registry.create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..])).unwrap();
        registry.create_api_spec(VERSION, "proto", &yaml(), Some(&b"v0"[..])).unwrap();

        let request = ListRequest::new(VERSION).filter(format!("name == '{}'", SPEC));
        let page = registry.list_api_specs(&request).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].spec.spec_id, "openapi");

        let every_spec = ListRequest::new("projects/p1/apis/a1/versions/v1/specs/-");
        let revisions = registry
            .list_api_spec_revisions(&every_spec.filter(format!("name == '{}'", SPEC)))
            .unwrap();
        assert_eq!(revisions.items.len(), 1);
    }

    #[test]
    fn test_full_view_lists_contents() {
        let registry = registry();
        registry.create_api_spec(VERSION, "openapi", &yaml(), Some(&b"v0"[..])).unwrap();
        registry
            .update_api_spec(SPEC, &Spec::default(), Some(&b"v1"[..]), &UpdateOptions::default())
            .unwrap();

        let current = registry
            .list_api_specs(&ListRequest::new(VERSION).view(View::Full))
            .unwrap();
        assert_eq!(current.items[0].contents.as_deref(), Some(&b"v1"[..]));

        let revisions = registry
            .list_api_spec_revisions(&ListRequest::new(SPEC).view(View::Full))
            .unwrap();
        let contents: Vec<_> = revisions.items.iter().map(|s| s.contents.clone().unwrap()).collect();
        assert_eq!(contents, vec![b"v1".to_vec(), b"v0".to_vec()]);
    }
}
