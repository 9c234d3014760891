//! Fields a list filter may reference, per resource kind.

use crate::filter::{FieldType, Schema};

pub(crate) fn projects() -> Schema {
    Schema::new()
        .strings(&["name", "project_id", "display_name", "description"])
        .field("create_time", FieldType::Timestamp)
        .field("update_time", FieldType::Timestamp)
}

pub(crate) fn apis() -> Schema {
    Schema::new()
        .strings(&[
            "name",
            "project_id",
            "api_id",
            "display_name",
            "description",
            "availability",
            "recommended_version",
        ])
        .field("create_time", FieldType::Timestamp)
        .field("update_time", FieldType::Timestamp)
        .field("labels", FieldType::StringMap)
        .field("annotations", FieldType::StringMap)
}

pub(crate) fn versions() -> Schema {
    Schema::new()
        .strings(&[
            "name",
            "project_id",
            "api_id",
            "version_id",
            "display_name",
            "description",
            "state",
        ])
        .field("create_time", FieldType::Timestamp)
        .field("update_time", FieldType::Timestamp)
        .field("labels", FieldType::StringMap)
        .field("annotations", FieldType::StringMap)
}

pub(crate) fn specs() -> Schema {
    Schema::new()
        .strings(&[
            "name",
            "project_id",
            "api_id",
            "version_id",
            "spec_id",
            "revision_id",
            "description",
            "filename",
            "mime_type",
            "hash",
            "source_uri",
            "currency",
        ])
        .field("size_bytes", FieldType::Int)
        .field("create_time", FieldType::Timestamp)
        .field("revision_create_time", FieldType::Timestamp)
        .field("revision_update_time", FieldType::Timestamp)
        .field("labels", FieldType::StringMap)
        .field("annotations", FieldType::StringMap)
}

pub(crate) fn deployments() -> Schema {
    Schema::new()
        .strings(&[
            "name",
            "project_id",
            "api_id",
            "version_id",
            "deployment_id",
            "revision_id",
            "display_name",
            "description",
            "api_spec_revision",
            "endpoint_uri",
            "external_channel_uri",
            "intended_audience",
            "access_guidance",
            "currency",
        ])
        .field("create_time", FieldType::Timestamp)
        .field("revision_create_time", FieldType::Timestamp)
        .field("revision_update_time", FieldType::Timestamp)
        .field("labels", FieldType::StringMap)
        .field("annotations", FieldType::StringMap)
}

pub(crate) fn artifacts() -> Schema {
    Schema::new()
        .strings(&[
            "name",
            "project_id",
            "api_id",
            "version_id",
            "spec_id",
            "deployment_id",
            "artifact_id",
            "parent",
            "parent_level",
            "mime_type",
            "hash",
        ])
        .field("size_bytes", FieldType::Int)
        .field("create_time", FieldType::Timestamp)
        .field("update_time", FieldType::Timestamp)
}
