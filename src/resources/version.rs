//! `readme_version`: a project version, forked from an existing one.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{identifier, imported, read_back, Lookup, Resource, ResourceContext};
use crate::client::{Version, VersionParams};
use crate::error::ProviderError;
use crate::plan::{ChangedIf, Snapshot};
use crate::schema::{Attribute, Schema};
use crate::types::StateResult;

/// Resource type name.
pub const TYPE_NAME: &str = "readme_version";

/// Manages versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionResource;

fn flag(description: &str) -> Attribute {
    Attribute::optional_computed_bool().with_description(description)
}

impl VersionResource {
    fn params(planned: &Snapshot, creating: bool) -> Result<VersionParams, ProviderError> {
        let version = planned
            .known::<String>("version")
            .filter(|version| !version.is_empty())
            .ok_or_else(|| ProviderError::Validation("`version` must be known at apply".to_string()))?;
        let from = if creating {
            Some(planned.known::<String>("from").ok_or_else(|| {
                ProviderError::Validation("`from` must be known at apply".to_string())
            })?)
        } else {
            None
        };

        Ok(VersionParams {
            version,
            codename: planned.known("codename"),
            from,
            is_stable: planned.known("is_stable"),
            is_beta: planned.known("is_beta"),
            is_hidden: planned.known("is_hidden"),
            is_deprecated: planned.known("is_deprecated"),
        })
    }

    async fn state(
        &self,
        ctx: &ResourceContext,
        version: &Version,
        known: &Snapshot,
        lookup: Lookup,
    ) -> Result<StateResult, ProviderError> {
        let mut diagnostics = Vec::new();

        let from = match known.known::<String>("from") {
            Some(from) => Some(from),
            None if version.forked_from.is_empty() => None,
            None => match ctx.client.find_version_by_id(&version.forked_from).await {
                Ok(Some(parent)) => Some(parent.version),
                Ok(None) => {
                    lookup.missing("from", "forked version", &mut diagnostics)?;
                    None
                }
                Err(err) => {
                    lookup.failed("from", "forked version", err, &mut diagnostics)?;
                    None
                }
            },
        };

        let state = json!({
            "id": version.id,
            "version": version.version,
            "version_clean": version.version_clean,
            "from": from,
            "codename": version.codename,
            "is_stable": version.is_stable,
            "is_beta": version.is_beta,
            "is_hidden": version.is_hidden,
            "is_deprecated": version.is_deprecated,
            "project": version.project,
            "release_date": version.release_date,
            "created_at": version.created_at,
        });
        Ok(StateResult::new(state).with_diagnostics(diagnostics))
    }
}

#[async_trait]
impl Resource for VersionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A ReadMe project version.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "version",
                Attribute::required_string().with_description("Semantic version, e.g. `1.1`."),
            )
            .with_attribute(
                "version_clean",
                Attribute::computed_string()
                    .with_plan_modifier(ChangedIf::<String, String>::shared("version")),
            )
            .with_attribute(
                "from",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The version to fork docs from."),
            )
            .with_attribute("codename", Attribute::optional_computed_string())
            .with_attribute(
                "is_stable",
                flag("Make this the stable version.")
                    .with_conflicts_with("is_hidden")
                    .with_conflicts_with("is_deprecated"),
            )
            .with_attribute("is_beta", flag("Mark the version as beta."))
            .with_attribute("is_hidden", flag("Hide the version from the version picker."))
            .with_attribute("is_deprecated", flag("Mark the version as deprecated."))
            .with_attribute("project", Attribute::computed_string())
            .with_attribute("release_date", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        planned: &Value,
    ) -> Result<StateResult, ProviderError> {
        let planned = Snapshot::new(planned.clone());
        let params = Self::params(&planned, true)?;

        let created = ctx.client.create_version(&params).await?;
        info!(version = %created.version, "created version");

        let version = read_back("create version", || ctx.client.get_version(&created.version))
            .await?;
        self.state(ctx, &version, &planned, Lookup::BestEffort).await
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError> {
        let current = Snapshot::new(current.clone());
        let name = identifier(&current, "version")?;

        match ctx.client.get_version(&name).await? {
            Some(version) => {
                debug!(version = %name, "read version");
                self.state(ctx, &version, &current, Lookup::BestEffort).await
            }
            None => {
                warn!(version = %name, "version no longer exists, removing it from state");
                Ok(StateResult::removed())
            }
        }
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<StateResult, ProviderError> {
        let prior = Snapshot::new(prior.clone());
        let planned = Snapshot::new(planned.clone());
        let name = identifier(&prior, "version")?;
        let params = Self::params(&planned, false)?;

        let updated = ctx.client.update_version(&name, &params).await?;
        info!(version = %updated.version, previous = %name, "updated version");

        let version = read_back("update version", || ctx.client.get_version(&updated.version))
            .await?;
        self.state(ctx, &version, &planned, Lookup::BestEffort).await
    }

    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError> {
        let current = Snapshot::new(current.clone());
        let name = identifier(&current, "version")?;

        if ctx.client.delete_version(&name).await? {
            info!(version = %name, "deleted version");
        } else {
            debug!(version = %name, "version was already deleted");
        }
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError> {
        let name = id.trim();
        if name.is_empty() {
            return Err(ProviderError::Validation(
                "invalid import identifier: expected a version".to_string(),
            ));
        }

        let version = ctx
            .client
            .get_version(name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("version `{}`", name)))?;

        let result = self
            .state(ctx, &version, &Snapshot::empty(), Lookup::Required)
            .await?;
        Ok(imported(&self.schema(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiError, InMemoryReadme, ReadmeApi};
    use crate::plan::plan_resource;
    use std::sync::Arc;

    fn context() -> (InMemoryReadme, ResourceContext) {
        let api = InMemoryReadme::new();
        let ctx = ResourceContext {
            client: Arc::new(api.clone()),
            destroy_child_docs: false,
        };
        (api, ctx)
    }

    async fn create(ctx: &ResourceContext, config: Value) -> Value {
        let plan = plan_resource(&VersionResource.schema(), None, &config, &config);
        VersionResource
            .create(ctx, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap()
    }

    #[tokio::test]
    async fn test_fork_and_replan() {
        let (_api, ctx) = context();
        let config = json!({"version": "v2.0", "from": "1.0", "is_beta": true});
        let state = create(&ctx, config.clone()).await;

        assert_eq!(state["version_clean"], "2.0");
        assert_eq!(state["from"], "1.0");
        assert_eq!(state["is_beta"], true);
        assert_eq!(state["is_stable"], false);

        let plan = plan_resource(&VersionResource.schema(), Some(&state), &config, &config);
        assert!(plan.changes.is_empty(), "{:?}", plan.changes);
    }

    #[tokio::test]
    async fn test_read_after_removal_and_idempotent_delete() {
        let (api, ctx) = context();
        let state = create(&ctx, json!({"version": "2.0", "from": "1.0"})).await;

        assert!(api.remove_version("2.0").is_some());
        let result = VersionResource.read(&ctx, &state).await.unwrap();
        assert!(result.state.is_none());

        VersionResource.delete(&ctx, &state).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_and_promote() {
        let (api, ctx) = context();
        let state = create(&ctx, json!({"version": "2.0", "from": "1.0"})).await;

        let config = json!({"version": "2.1", "from": "1.0", "is_stable": true});
        let plan = plan_resource(&VersionResource.schema(), Some(&state), &config, &config);
        assert!(!plan.requires_replace);
        assert!(Snapshot::new(plan.planned_state.clone()).is_unknown("version_clean"));

        let updated = VersionResource
            .update(&ctx, &state, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(updated["version_clean"], "2.1");
        assert_eq!(updated["is_stable"], true);

        let previous = api.get_version("1.0").await.unwrap().unwrap();
        assert!(!previous.is_stable);
    }

    #[tokio::test]
    async fn test_changing_from_forces_replacement() {
        let (_api, ctx) = context();
        let state = create(&ctx, json!({"version": "2.0", "from": "1.0"})).await;
        create(&ctx, json!({"version": "3.0", "from": "1.0"})).await;

        let config = json!({"version": "2.0", "from": "3.0"});
        let plan = plan_resource(&VersionResource.schema(), Some(&state), &config, &config);
        assert!(plan.requires_replace);
    }

    #[test]
    fn test_stable_conflicts_with_hidden() {
        let diagnostics = VersionResource.validate(&json!({
            "version": "2.0",
            "from": "1.0",
            "is_stable": true,
            "is_hidden": true,
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Conflicting attributes");

        let diagnostics = VersionResource.validate(&json!({
            "version": "2.0",
            "from": "1.0",
            "is_stable": true,
            "is_hidden": false,
        }));
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_import_resolves_fork_parent() {
        let (api, ctx) = context();
        create(&ctx, json!({"version": "2.0", "from": "1.0"})).await;

        let imported = VersionResource
            .import(&ctx, "2.0")
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(imported["from"], "1.0");

        api.fail_next("list_versions", ApiError::new(500, "boom"));
        let err = VersionResource.import(&ctx, "2.0").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }

    #[tokio::test]
    async fn test_read_lag_is_retried() {
        let api = InMemoryReadme::new().with_read_lag(2);
        let ctx = ResourceContext {
            client: Arc::new(api.clone()),
            destroy_child_docs: false,
        };
        let state = create(&ctx, json!({"version": "2.0", "from": "1.0"})).await;

        assert_eq!(state["version"], "2.0");
        let reads = api.calls().iter().filter(|call| **call == "get_version").count();
        assert_eq!(reads, 3);
    }
}
