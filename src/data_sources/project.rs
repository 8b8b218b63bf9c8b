//! `readme_project` data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{merge, with_computed, DataSource};
use crate::client::ReadmeApi;
use crate::error::ProviderError;
use crate::schema::{AttributeType, Schema};

/// The project the API token belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectDataSource;

#[async_trait]
impl DataSource for ProjectDataSource {
    fn type_name(&self) -> &'static str {
        "readme_project"
    }

    fn schema(&self) -> Schema {
        with_computed(
            Schema::v0().with_description("The project the API token belongs to."),
            vec![
                ("name", AttributeType::String),
                ("subdomain", AttributeType::String),
                ("base_url", AttributeType::String),
                ("plan", AttributeType::String),
            ],
        )
    }

    async fn read(&self, client: &dyn ReadmeApi, config: &Value) -> Result<Value, ProviderError> {
        let project = client.get_project().await?;
        debug!(subdomain = %project.subdomain, "read project data source");
        Ok(merge(
            config,
            json!({
                "name": project.name,
                "subdomain": project.subdomain,
                "base_url": project.base_url,
                "plan": project.plan,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryReadme, Project};

    #[tokio::test]
    async fn test_read_project() {
        let state = ProjectDataSource
            .read(&InMemoryReadme::new(), &json!({}))
            .await
            .unwrap();
        assert_eq!(state["subdomain"], "test-project");
        assert_eq!(state["plan"], "business");
    }

    #[tokio::test]
    async fn test_read_replaced_project() {
        let api = InMemoryReadme::new();
        api.set_project(Project {
            name: "Docs".to_string(),
            subdomain: "docs".to_string(),
            base_url: "https://docs.example.com".to_string(),
            plan: "startup".to_string(),
        });

        let state = ProjectDataSource.read(&api, &json!({})).await.unwrap();
        assert_eq!(state["name"], "Docs");
        assert_eq!(state["base_url"], "https://docs.example.com");
        assert_eq!(state["plan"], "startup");
    }
}
