//! `readme_changelog` data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{merge, required, with_computed, DataSource};
use crate::client::ReadmeApi;
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeType, Schema};

/// Looks up a changelog post by slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangelogDataSource;

#[async_trait]
impl DataSource for ChangelogDataSource {
    fn type_name(&self) -> &'static str {
        "readme_changelog"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a changelog post by slug.")
            .with_attribute("slug", Attribute::required_string());
        with_computed(
            schema,
            vec![
                ("id", AttributeType::String),
                ("title", AttributeType::String),
                ("body", AttributeType::String),
                ("html", AttributeType::String),
                ("type", AttributeType::String),
                ("hidden", AttributeType::Bool),
                ("revision", AttributeType::Int64),
                ("created_at", AttributeType::String),
                ("updated_at", AttributeType::String),
            ],
        )
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let slug = required(&Snapshot::new(config.clone()), "slug")?;
        let changelog = client
            .get_changelog(&slug)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("changelog `{}`", slug)))?;
        debug!(slug = %slug, "read changelog data source");

        Ok(merge(
            config,
            json!({
                "id": changelog.id,
                "title": changelog.title,
                "body": changelog.body,
                "html": changelog.html,
                "type": changelog.changelog_type,
                "hidden": changelog.hidden,
                "revision": changelog.revision,
                "created_at": changelog.created_at,
                "updated_at": changelog.updated_at,
            }),
        ))
    }
}
