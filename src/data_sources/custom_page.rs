//! `readme_custom_page` data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{merge, required, with_computed, DataSource};
use crate::client::ReadmeApi;
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeType, Schema};

/// Looks up a custom page by slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomPageDataSource;

#[async_trait]
impl DataSource for CustomPageDataSource {
    fn type_name(&self) -> &'static str {
        "readme_custom_page"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a custom page by slug.")
            .with_attribute("slug", Attribute::required_string());
        with_computed(
            schema,
            vec![
                ("id", AttributeType::String),
                ("title", AttributeType::String),
                ("body", AttributeType::String),
                ("html", AttributeType::String),
                ("htmlmode", AttributeType::Bool),
                ("hidden", AttributeType::Bool),
                ("fullscreen", AttributeType::Bool),
                ("revision", AttributeType::Int64),
                ("created_at", AttributeType::String),
                ("updated_at", AttributeType::String),
            ],
        )
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let slug = required(&Snapshot::new(config.clone()), "slug")?;
        let page = client
            .get_custom_page(&slug)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("custom page `{}`", slug)))?;
        debug!(slug = %slug, "read custom page data source");

        Ok(merge(
            config,
            json!({
                "id": page.id,
                "title": page.title,
                "body": page.body,
                "html": page.html,
                "htmlmode": page.html_mode,
                "hidden": page.hidden,
                "fullscreen": page.fullscreen,
                "revision": page.revision,
                "created_at": page.created_at,
                "updated_at": page.updated_at,
            }),
        ))
    }
}
