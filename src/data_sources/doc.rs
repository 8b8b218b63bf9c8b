//! `readme_doc` data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{merge, required, with_computed, DataSource, Fields};
use crate::client::{Doc, ReadmeApi, RequestOptions};
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeType, Schema};

/// Looks up a doc by slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocDataSource;

fn fields() -> Fields {
    vec![
        ("id", AttributeType::String),
        ("title", AttributeType::String),
        ("body", AttributeType::String),
        ("body_html", AttributeType::String),
        ("category", AttributeType::String),
        ("hidden", AttributeType::Bool),
        ("order", AttributeType::Int64),
        ("parent_doc", AttributeType::String),
        ("type", AttributeType::String),
        ("error_code", AttributeType::String),
        ("excerpt", AttributeType::String),
        ("revision", AttributeType::Int64),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
        ("is_api", AttributeType::Bool),
        ("is_reference", AttributeType::Bool),
        ("deprecated", AttributeType::Bool),
        ("project", AttributeType::String),
        ("user", AttributeType::String),
    ]
}

fn to_json(doc: &Doc) -> Value {
    json!({
        "id": doc.id,
        "title": doc.title,
        "slug": doc.slug,
        "body": doc.body,
        "body_html": doc.body_html,
        "category": doc.category,
        "hidden": doc.hidden,
        "order": doc.order,
        "parent_doc": doc.parent_doc,
        "type": doc.doc_type,
        "error_code": doc.error.code,
        "excerpt": doc.excerpt,
        "revision": doc.revision,
        "created_at": doc.created_at,
        "updated_at": doc.updated_at,
        "is_api": doc.is_api,
        "is_reference": doc.is_reference,
        "deprecated": doc.deprecated,
        "project": doc.project,
        "user": doc.user,
    })
}

#[async_trait]
impl DataSource for DocDataSource {
    fn type_name(&self) -> &'static str {
        "readme_doc"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a doc by slug.")
            .with_attribute("slug", Attribute::required_string())
            .with_attribute(
                "version",
                Attribute::optional_string()
                    .with_description("Project version. Defaults to the stable version."),
            );
        with_computed(schema, fields())
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let snapshot = Snapshot::new(config.clone());
        let slug = required(&snapshot, "slug")?;
        let options = RequestOptions::version(snapshot.known::<String>("version"));

        let doc = client
            .get_doc(&slug, &options)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("doc `{}`", slug)))?;
        debug!(slug = %slug, "read doc data source");
        Ok(merge(config, to_json(&doc)))
    }
}
