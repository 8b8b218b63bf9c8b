//! `readme_version` and `readme_versions` data sources.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{computed_list, merge, required, with_computed, DataSource, Fields};
use crate::client::{ReadmeApi, Version};
use crate::error::ProviderError;
use crate::plan::Snapshot;
use crate::schema::{Attribute, AttributeType, Schema};

fn fields() -> Fields {
    vec![
        ("id", AttributeType::String),
        ("version", AttributeType::String),
        ("version_clean", AttributeType::String),
        ("codename", AttributeType::String),
        ("is_stable", AttributeType::Bool),
        ("is_beta", AttributeType::Bool),
        ("is_hidden", AttributeType::Bool),
        ("is_deprecated", AttributeType::Bool),
        ("forked_from", AttributeType::String),
        ("project", AttributeType::String),
        ("release_date", AttributeType::String),
        ("created_at", AttributeType::String),
    ]
}

fn to_json(version: &Version) -> Value {
    json!({
        "id": version.id,
        "version": version.version,
        "version_clean": version.version_clean,
        "codename": version.codename,
        "is_stable": version.is_stable,
        "is_beta": version.is_beta,
        "is_hidden": version.is_hidden,
        "is_deprecated": version.is_deprecated,
        "forked_from": version.forked_from,
        "project": version.project,
        "release_date": version.release_date,
        "created_at": version.created_at,
    })
}

/// Looks up a version.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionDataSource;

#[async_trait]
impl DataSource for VersionDataSource {
    fn type_name(&self) -> &'static str {
        "readme_version"
    }

    fn schema(&self) -> Schema {
        let fields = fields()
            .into_iter()
            .filter(|(name, _)| *name != "version")
            .collect();
        let schema = Schema::v0()
            .with_description("Look up a project version.")
            .with_attribute("version", Attribute::required_string());
        with_computed(schema, fields)
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let snapshot = Snapshot::new(config.clone());
        let name = required(&snapshot, "version")?;

        let version = client
            .get_version(&name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("version `{}`", name)))?;
        debug!(version = %name, "read version data source");
        Ok(merge(config, to_json(&version)))
    }
}

/// Lists every version of the project.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionsDataSource;

#[async_trait]
impl DataSource for VersionsDataSource {
    fn type_name(&self) -> &'static str {
        "readme_versions"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List the project's versions.")
            .with_attribute("versions", computed_list(fields()))
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let versions = client.list_versions().await?;
        debug!(count = versions.len(), "read versions data source");
        let versions: Vec<Value> = versions.iter().map(to_json).collect();
        Ok(merge(config, json!({ "versions": versions })))
    }
}
