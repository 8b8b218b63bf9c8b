//! Read-only lookups of ReadMe entities.
//!
//! Data sources fetch and map; they never resolve front matter or plan.

pub mod api_specifications;
pub mod category;
pub mod changelog;
pub mod custom_page;
pub mod doc;
pub mod project;
pub mod version;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ReadmeApi;
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::validation;

pub use api_specifications::{ApiSpecificationsDataSource, SpecificationFilter};
pub use category::{CategoriesDataSource, CategoryDataSource};
pub use changelog::ChangelogDataSource;
pub use custom_page::CustomPageDataSource;
pub use doc::DocDataSource;
pub use project::ProjectDataSource;
pub use version::{VersionDataSource, VersionsDataSource};

/// A read-only ReadMe lookup.
#[async_trait]
pub trait DataSource: Send + Sync + Debug {
    /// The data source type name, e.g. `readme_doc`.
    fn type_name(&self) -> &'static str;

    /// The data source schema.
    fn schema(&self) -> Schema;

    /// Validate a configuration before reading.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Look the entity up and return the complete state.
    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError>;
}

/// Every data source this provider offers.
pub fn all() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(ApiSpecificationsDataSource),
        Arc::new(CategoriesDataSource),
        Arc::new(CategoryDataSource),
        Arc::new(ChangelogDataSource),
        Arc::new(CustomPageDataSource),
        Arc::new(DocDataSource),
        Arc::new(ProjectDataSource),
        Arc::new(VersionDataSource),
        Arc::new(VersionsDataSource),
    ]
}

/// Name and type of an entity's fields.
pub(crate) type Fields = Vec<(&'static str, AttributeType)>;

/// Add `fields` to `schema` as computed attributes.
pub(crate) fn with_computed(schema: Schema, fields: Fields) -> Schema {
    fields.into_iter().fold(schema, |schema, (name, attr_type)| {
        schema.with_attribute(name, Attribute::new(attr_type, AttributeFlags::computed()))
    })
}

/// A computed list of objects with `fields`.
pub(crate) fn computed_list(fields: Fields) -> Attribute {
    Attribute::new(
        AttributeType::list(AttributeType::object(fields)),
        AttributeFlags::computed(),
    )
}

/// A lookup key that must be set.
pub(crate) fn required(config: &Snapshot, attribute: &str) -> Result<String, ProviderError> {
    config
        .known::<String>(attribute)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("`{}` is required", attribute)))
}

/// Merge `entity` fields into the configuration to form the state.
pub(crate) fn merge(config: &Value, entity: Value) -> Value {
    let mut state = match config {
        Value::Object(config) => config.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(fields) = entity {
        state.extend(fields);
    }
    Value::Object(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_are_unique_and_prefixed() {
        let names: Vec<_> = all().iter().map(|source| source.type_name()).collect();
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();

        assert_eq!(unique.len(), 9);
        assert!(names.iter().all(|name| name.starts_with("readme_")));
    }

    #[test]
    fn test_merge_keeps_inputs() {
        let state = merge(
            &json!({"slug": "intro", "version": null}),
            json!({"id": "doc-1", "slug": "intro"}),
        );
        assert_eq!(state, json!({"slug": "intro", "version": null, "id": "doc-1"}));
    }

    #[test]
    fn test_required() {
        let config = Snapshot::new(json!({"slug": ""}));
        assert!(required(&config, "slug").is_err());
        assert!(required(&Snapshot::new(json!({"slug": "a"})), "slug").is_ok());
    }
}
