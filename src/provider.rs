//! The ReadMe provider.
//!
//! [`ReadmeProvider`] builds one API client at configure time and dispatches
//! every operation to the resource or data source named by its type.
//!
//! # Configuration
//!
//! ```text
//! provider "readme" {
//!   api_token = "rdme_..."   # or README_API_KEY
//!   api_url   = "..."        # or README_API_URL, default https://dash.readme.com/api/v1
//!
//!   config {
//!     destroy_child_docs = true
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::{HttpReadme, ReadmeApi, DEFAULT_API_URL};
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource, ResourceContext};
use crate::schema::{has_errors, Attribute, Block, Diagnostic, NestedBlock, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, StateResult};
use crate::validation;

/// Environment variable holding the API token.
pub const API_TOKEN_ENV: &str = "README_API_KEY";

/// Environment variable overriding the API URL.
pub const API_URL_ENV: &str = "README_API_URL";

/// The provider configuration block.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderConfig {
    /// ReadMe API token.
    #[serde(default)]
    pub api_token: Option<SecretString>,
    /// Base URL of the API.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Behaviour switches.
    #[serde(default)]
    pub config: Option<Features>,
}

/// Optional behaviour of the provider.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Features {
    /// Delete a doc's children before deleting the doc.
    #[serde(default)]
    pub destroy_child_docs: Option<bool>,
}

impl ProviderConfig {
    /// Parse the JSON configuration sent by the orchestrator.
    pub fn from_json(config: Value) -> Result<Self, ProviderError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(config)?)
    }

    fn destroy_child_docs(&self) -> bool {
        self.config
            .and_then(|features| features.destroy_child_docs)
            .unwrap_or(false)
    }
}

/// Where unset configuration falls back to.
#[derive(Debug, Clone, Default)]
enum Environment {
    /// The process environment.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

impl Environment {
    fn var(&self, name: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|value| !value.trim().is_empty())
    }
}

/// The ReadMe provider.
#[derive(Debug)]
pub struct ReadmeProvider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
    client: Option<Arc<dyn ReadmeApi>>,
    env: Environment,
    context: RwLock<Option<ResourceContext>>,
}

impl Default for ReadmeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadmeProvider {
    /// A provider talking to the ReadMe API over HTTP once configured.
    pub fn new() -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|resource| (resource.type_name(), resource))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|source| (source.type_name(), source))
                .collect(),
            client: None,
            env: Environment::Process,
            context: RwLock::new(None),
        }
    }

    /// Use `client` instead of building an HTTP client at configure time.
    pub fn with_client(mut self, client: Arc<dyn ReadmeApi>) -> Self {
        self.client = Some(client);
        self
    }

    /// Resolve environment fallbacks from `vars` instead of the process
    /// environment.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Environment::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn context(&self) -> Result<ResourceContext, ProviderError> {
        self.context.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("the provider has not been configured".to_string())
        })
    }

    fn config_schema() -> Schema {
        let features = Block::new().with_attribute(
            "destroy_child_docs",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Delete child docs before deleting their parent doc."),
        );

        Schema::v0()
            .with_description("Manage documentation hosted on ReadMe.")
            .with_attribute(
                "api_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "ReadMe API token. Falls back to the {} environment variable.",
                        API_TOKEN_ENV
                    )),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string().with_description(format!(
                    "ReadMe API URL. Falls back to {}, then {}.",
                    API_URL_ENV, DEFAULT_API_URL
                )),
            )
            .with_block("config", NestedBlock::single(features))
    }

    fn api_token(&self, configured: Option<SecretString>) -> Option<SecretString> {
        configured
            .filter(|token| !token.expose_secret().trim().is_empty())
            .or_else(|| self.env.var(API_TOKEN_ENV).map(SecretString::new))
    }

    fn api_url(&self, config: &ProviderConfig) -> String {
        config
            .api_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.env.var(API_URL_ENV))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}

fn missing_token() -> Diagnostic {
    Diagnostic::error("Missing API token")
        .with_detail(format!(
            "Set `api_token` in the provider configuration or the {} environment variable.",
            API_TOKEN_ENV
        ))
        .with_attribute("api_token")
}

#[async_trait::async_trait]
impl ProviderService for ReadmeProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(Self::config_schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, resource)| {
                schema.with_resource(*name, resource.schema())
            });
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, source)| {
                schema.with_data_source(*name, source.schema())
            })
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&Self::config_schema(), &config);
        if let Some(url) = config.get("api_url").and_then(Value::as_str) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                diagnostics.push(
                    Diagnostic::error("Invalid API URL")
                        .with_detail(format!("`{}` is not an http(s) URL.", url))
                        .with_attribute("api_url"),
                );
            }
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut config = ProviderConfig::from_json(config)?;

        let Some(token) = self.api_token(config.api_token.take()) else {
            warn!("configuration has no API token");
            return Ok(vec![missing_token()]);
        };

        let client = match &self.client {
            Some(client) => Arc::clone(client),
            None => {
                let url = self.api_url(&config);
                debug!(url = %url, "building ReadMe client");
                let client = HttpReadme::new(&url, token)
                    .map_err(|err| ProviderError::Configuration(err.message))?;
                Arc::new(client) as Arc<dyn ReadmeApi>
            }
        };

        let context = ResourceContext {
            client,
            destroy_child_docs: config.destroy_child_docs(),
        };
        info!(
            destroy_child_docs = context.destroy_child_docs,
            "provider configured"
        );
        *self.context.write().await = Some(context);
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.context.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;

        let mut diagnostics = if config.is_null() {
            Vec::new()
        } else {
            resource.validate(&config)
        };
        if has_errors(&diagnostics) {
            return Ok(PlanResult::no_change(proposed_state).with_diagnostics(diagnostics));
        }

        let mut result = plan_resource(
            &resource.schema(),
            prior_state.as_ref(),
            &proposed_state,
            &config,
        );
        diagnostics.append(&mut result.diagnostics);
        Ok(result.with_diagnostics(diagnostics))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<StateResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        resource.create(&ctx, &planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<StateResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        resource.read(&ctx, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<StateResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        resource.update(&ctx, &prior_state, &planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        resource.delete(&ctx, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        let result = resource.import(&ctx, id).await?;

        for diagnostic in &result.diagnostics {
            warn!(resource_type, id, summary = %diagnostic.summary, "import diagnostic");
        }
        match result.state {
            Some(state) => Ok(vec![ImportedResource::new(resource_type, state)]),
            None => Err(ProviderError::NotFound(format!("{} `{}`", resource_type, id))),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let source = self.data_source(data_source_type)?;
        let ctx = self.context().await?;
        source.read(ctx.client.as_ref(), &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryReadme;

    fn provider() -> ReadmeProvider {
        ReadmeProvider::new()
            .with_client(Arc::new(InMemoryReadme::new()))
            .with_env(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_schema_lists_every_type() {
        let schema = provider().schema();
        assert_eq!(schema.resources.len(), 5);
        assert_eq!(schema.data_sources.len(), 9);
        assert!(schema.resources.contains_key("readme_doc"));
        assert!(schema.data_sources.contains_key("readme_api_specifications"));

        let token = schema.provider.attribute("api_token").unwrap();
        assert!(token.flags.sensitive);
        assert!(schema.provider.block.blocks.contains_key("config"));
    }

    #[test]
    fn test_parse_config() {
        let config = ProviderConfig::from_json(json!({
            "api_token": "secret",
            "api_url": null,
            "config": {"destroy_child_docs": true}
        }))
        .unwrap();
        assert_eq!(config.api_token.unwrap().expose_secret(), "secret");
        assert!(config.api_url.is_none());
        assert_eq!(config.config.and_then(|c| c.destroy_child_docs), Some(true));

        let empty = ProviderConfig::from_json(Value::Null).unwrap();
        assert!(!empty.destroy_child_docs());
    }

    #[test]
    fn test_env_fallbacks() {
        let provider = provider().with_env([
            (API_TOKEN_ENV, "from-env"),
            (API_URL_ENV, "https://readme.example/api/v1"),
        ]);

        let config = ProviderConfig::from_json(json!({"api_token": ""})).unwrap();
        assert_eq!(
            provider.api_url(&config),
            "https://readme.example/api/v1"
        );
        let token = provider.api_token(config.api_token).unwrap();
        assert_eq!(token.expose_secret(), "from-env");

        let config = ProviderConfig::from_json(json!({"api_url": "http://localhost:1"})).unwrap();
        assert_eq!(provider.api_url(&config), "http://localhost:1");
    }

    #[test]
    fn test_default_url() {
        let config = ProviderConfig::default();
        assert_eq!(provider().api_url(&config), DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_configure_without_token() {
        let provider = provider();
        let diagnostics = provider.configure(json!({})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_token"));

        let err = provider.context().await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_and_stop() {
        let provider = provider();
        let diagnostics = provider
            .configure(json!({"api_token": "t", "config": {"destroy_child_docs": true}}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        assert!(provider.context().await.unwrap().destroy_child_docs);

        provider.stop().await.unwrap();
        assert!(provider.context().await.is_err());
    }

    #[tokio::test]
    async fn test_validate_provider_config_rejects_bad_url() {
        let diagnostics = provider()
            .validate_provider_config(json!({"api_url": "dash.readme.com"}))
            .await
            .unwrap();
        assert!(has_errors(&diagnostics));
    }

    #[tokio::test]
    async fn test_configure_rejects_unusable_url() {
        let provider = ReadmeProvider::new().with_env(Vec::<(String, String)>::new());
        let err = provider
            .configure(json!({"api_token": "t", "api_url": "dash.readme.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(provider.context().await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = provider();
        let err = provider
            .plan("readme_widget", None, json!({}), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .read_data_source("readme_widget", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
