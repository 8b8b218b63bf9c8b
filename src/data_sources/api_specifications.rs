//! `readme_api_specifications` data source.
//!
//! Lists a version's API specifications, optionally narrowed by a `filter`
//! block. Each filter field is a list of accepted values: a specification
//! matches a field when it equals any listed value, and must match every
//! field that is set. `has_category` gates the rest: a specification whose
//! category presence differs is dropped before anything else is compared.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{computed_list, merge, DataSource};
use crate::client::{ApiSpecification, ReadmeApi, RequestOptions};
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

/// Narrows the listed specifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SpecificationFilter {
    /// Accepted titles.
    #[serde(default)]
    pub title: Option<Vec<String>>,
    /// Accepted version IDs.
    #[serde(default)]
    pub version: Option<Vec<String>>,
    /// Accepted category IDs.
    #[serde(default)]
    pub category_id: Option<Vec<String>>,
    /// Accepted category slugs.
    #[serde(default)]
    pub category_slug: Option<Vec<String>>,
    /// Accepted category titles.
    #[serde(default)]
    pub category_title: Option<Vec<String>>,
    /// Require (or forbid) an attached category.
    #[serde(default)]
    pub has_category: Option<bool>,
}

fn accepts(accepted: &Option<Vec<String>>, value: Option<&str>) -> bool {
    match accepted {
        None => true,
        Some(accepted) if accepted.is_empty() => true,
        Some(accepted) => value.is_some_and(|value| accepted.iter().any(|a| a == value)),
    }
}

impl SpecificationFilter {
    /// Whether `spec` passes the filter.
    pub fn matches(&self, spec: &ApiSpecification) -> bool {
        if let Some(has_category) = self.has_category {
            if spec.category.is_some() != has_category {
                return false;
            }
        }

        let category = spec.category.as_ref();
        accepts(&self.title, Some(&spec.title))
            && accepts(&self.version, Some(&spec.version))
            && accepts(&self.category_id, category.map(|c| c.id.as_str()))
            && accepts(&self.category_slug, category.map(|c| c.slug.as_str()))
            && accepts(&self.category_title, category.map(|c| c.title.as_str()))
    }
}

fn string_list() -> Attribute {
    Attribute::new(
        AttributeType::list(AttributeType::String),
        AttributeFlags::optional(),
    )
}

fn to_json(spec: &ApiSpecification) -> Value {
    let category = spec.category.as_ref();
    json!({
        "id": spec.id,
        "title": spec.title,
        "last_synced": spec.last_synced,
        "source": spec.source,
        "type": spec.spec_type,
        "version": spec.version,
        "category_id": category.map(|c| c.id.as_str()),
        "category_slug": category.map(|c| c.slug.as_str()),
        "category_title": category.map(|c| c.title.as_str()),
    })
}

/// Lists API specifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiSpecificationsDataSource;

#[async_trait]
impl DataSource for ApiSpecificationsDataSource {
    fn type_name(&self) -> &'static str {
        "readme_api_specifications"
    }

    fn schema(&self) -> Schema {
        let filter = Block::new()
            .with_attribute("title", string_list())
            .with_attribute("version", string_list())
            .with_attribute("category_id", string_list())
            .with_attribute("category_slug", string_list())
            .with_attribute("category_title", string_list())
            .with_attribute("has_category", Attribute::optional_bool());

        Schema::v0()
            .with_description("List the API specifications of a version.")
            .with_attribute(
                "version",
                Attribute::optional_string()
                    .with_description("Project version. Defaults to the stable version."),
            )
            .with_block("filter", NestedBlock::single(filter))
            .with_attribute(
                "specs",
                computed_list(vec![
                    ("id", AttributeType::String),
                    ("title", AttributeType::String),
                    ("last_synced", AttributeType::String),
                    ("source", AttributeType::String),
                    ("type", AttributeType::String),
                    ("version", AttributeType::String),
                    ("category_id", AttributeType::String),
                    ("category_slug", AttributeType::String),
                    ("category_title", AttributeType::String),
                ]),
            )
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let snapshot = Snapshot::new(config.clone());
        let options = RequestOptions::version(snapshot.known::<String>("version"));
        let filter: Option<SpecificationFilter> =
            serde_json::from_value(config.get("filter").cloned().unwrap_or(Value::Null))?;
        let filter = filter.unwrap_or_default();

        let specs = client.list_api_specifications(&options).await?;
        let total = specs.len();
        let specs: Vec<Value> = specs
            .iter()
            .filter(|spec| filter.matches(spec))
            .map(to_json)
            .collect();
        debug!(total, matched = specs.len(), "read api specifications data source");

        Ok(merge(config, json!({ "specs": specs })))
    }
}
