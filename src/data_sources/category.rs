//! `readme_category` and `readme_categories` data sources.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{computed_list, merge, required, with_computed, DataSource, Fields};
use crate::client::{Category, ReadmeApi, RequestOptions};
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeType, Schema};

fn fields() -> Fields {
    vec![
        ("id", AttributeType::String),
        ("title", AttributeType::String),
        ("slug", AttributeType::String),
        ("type", AttributeType::String),
        ("order", AttributeType::Int64),
        ("reference", AttributeType::Bool),
        ("project", AttributeType::String),
        ("created_at", AttributeType::String),
    ]
}

fn to_json(category: &Category) -> Value {
    json!({
        "id": category.id,
        "title": category.title,
        "slug": category.slug,
        "type": category.category_type,
        "order": category.order,
        "reference": category.reference,
        "project": category.project,
        "created_at": category.created_at,
    })
}

fn version_attribute() -> Attribute {
    Attribute::optional_string().with_description("Project version. Defaults to the stable version.")
}

/// Looks up a category by slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryDataSource;

#[async_trait]
impl DataSource for CategoryDataSource {
    fn type_name(&self) -> &'static str {
        "readme_category"
    }

    fn schema(&self) -> Schema {
        let fields = fields()
            .into_iter()
            .filter(|(name, _)| *name != "slug")
            .collect();
        let schema = Schema::v0()
            .with_description("Look up a category by slug.")
            .with_attribute("slug", Attribute::required_string())
            .with_attribute("version", version_attribute());
        with_computed(schema, fields)
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let snapshot = Snapshot::new(config.clone());
        let slug = required(&snapshot, "slug")?;
        let options = RequestOptions::version(snapshot.known::<String>("version"));

        let category = client
            .get_category(&slug, &options)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("category `{}`", slug)))?;
        debug!(slug = %slug, "read category data source");
        Ok(merge(config, to_json(&category)))
    }
}

/// Lists every category of a version.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoriesDataSource;

#[async_trait]
impl DataSource for CategoriesDataSource {
    fn type_name(&self) -> &'static str {
        "readme_categories"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List the categories of a version.")
            .with_attribute("version", version_attribute())
            .with_attribute("categories", computed_list(fields()))
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let snapshot = Snapshot::new(config.clone());
        let options = RequestOptions::version(snapshot.known::<String>("version"));

        let categories = client.list_categories(&options).await?;
        debug!(count = categories.len(), "read categories data source");
        let categories: Vec<Value> = categories.iter().map(to_json).collect();
        Ok(merge(config, json!({ "categories": categories })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CategoryParams, InMemoryReadme};

    #[tokio::test]
    async fn test_read_categories() {
        let api = InMemoryReadme::new();
        for title in ["Guides", "API Reference"] {
            api.create_category(
                &CategoryParams {
                    title: title.to_string(),
                    category_type: None,
                },
                &RequestOptions::default(),
            )
            .await
            .unwrap();
        }

        let state = CategoryDataSource
            .read(&api, &json!({"slug": "guides"}))
            .await
            .unwrap();
        assert_eq!(state["title"], "Guides");
        assert_eq!(state["type"], "guide");

        let state = CategoriesDataSource.read(&api, &json!({})).await.unwrap();
        assert_eq!(state["categories"].as_array().map(Vec::len), Some(2));

        let err = CategoriesDataSource
            .read(&api, &json!({"version": "9.9"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api(ref api) if api.is_not_found()));
    }
}
