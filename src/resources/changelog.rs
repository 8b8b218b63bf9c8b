//! `readme_changelog`: a changelog post.
//!
//! Changelogs are project-wide, not versioned. `title`, `type` and `hidden`
//! may come from the body's front matter.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    check_requirements, effective, identifier, imported, read_back, reconcile_body, Requirement,
    Resource, ResourceContext,
};
use crate::client::{Changelog, ChangelogParams};
use crate::error::ProviderError;
use crate::frontmatter::FrontMatterKey;
use crate::plan::{ChangedIf, FrontMatterDefault, Kind, Snapshot};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::StateResult;
use crate::validation;

/// Resource type name.
pub const TYPE_NAME: &str = "readme_changelog";

/// Accepted values of `type`. The empty string is a plain post.
pub const CHANGELOG_TYPES: [&str; 6] = ["", "added", "fixed", "improved", "deprecated", "removed"];

const REQUIREMENTS: [Requirement; 1] = [Requirement {
    sources: &[("title", FrontMatterKey::Title)],
    summary: "Missing changelog title",
    detail: "Set `title`, or `title` in the body's front matter.",
}];

/// Manages changelogs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangelogResource;

fn recomputed_on_edit<D: Kind>(attribute: Attribute) -> Attribute {
    attribute
        .with_plan_modifier(ChangedIf::<String, D>::shared("body"))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "title",
            FrontMatterKey::Title,
        ))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "type",
            FrontMatterKey::Type,
        ))
        .with_plan_modifier(ChangedIf::<bool, D>::shared_with_front_matter(
            "hidden",
            FrontMatterKey::Hidden,
        ))
}

impl ChangelogResource {
    fn params(planned: &Snapshot) -> Result<ChangelogParams, ProviderError> {
        let title = effective::<String>(planned, "title", FrontMatterKey::Title)?.ok_or_else(|| {
            ProviderError::Validation(
                "`title` must be set in configuration or in the body's front matter".to_string(),
            )
        })?;
        Ok(ChangelogParams {
            title,
            changelog_type: effective(planned, "type", FrontMatterKey::Type)?,
            body: planned.known("body"),
            hidden: effective(planned, "hidden", FrontMatterKey::Hidden)?,
        })
    }

    fn state(changelog: &Changelog, known: &Snapshot) -> StateResult {
        let body = known
            .known::<String>("body")
            .map(|body| reconcile_body(Some(body), &changelog.body));

        StateResult::new(json!({
            "id": changelog.id,
            "title": changelog.title,
            "slug": changelog.slug,
            "body": body,
            "html": changelog.html,
            "type": changelog.changelog_type,
            "hidden": changelog.hidden,
            "revision": changelog.revision,
            "created_at": changelog.created_at,
            "updated_at": changelog.updated_at,
        }))
    }
}

#[async_trait]
impl Resource for ChangelogResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A ReadMe changelog post.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "title",
                Attribute::optional_computed_string()
                    .with_plan_modifier(FrontMatterDefault::<String>::shared(FrontMatterKey::Title)),
            )
            .with_attribute("slug", Attribute::computed_string())
            .with_attribute("body", Attribute::optional_string())
            .with_attribute(
                "html",
                Attribute::computed_string()
                    .with_plan_modifier(ChangedIf::<String, String>::shared("body")),
            )
            .with_attribute(
                "type",
                Attribute::optional_computed_string()
                    .with_one_of(CHANGELOG_TYPES)
                    .with_plan_modifier(FrontMatterDefault::<String>::shared(FrontMatterKey::Type)),
            )
            .with_attribute(
                "hidden",
                Attribute::optional_computed_bool()
                    .with_default(json!(true))
                    .with_plan_modifier(FrontMatterDefault::<bool>::shared(FrontMatterKey::Hidden)),
            )
            .with_attribute("revision", recomputed_on_edit::<i64>(Attribute::computed_int64()))
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute(
                "updated_at",
                recomputed_on_edit::<String>(Attribute::computed_string()),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&self.schema(), config);
        diagnostics.extend(check_requirements(config, &REQUIREMENTS));
        diagnostics
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        planned: &Value,
    ) -> Result<StateResult, ProviderError> {
        let planned = Snapshot::new(planned.clone());
        let params = Self::params(&planned)?;

        let created = ctx.client.create_changelog(&params).await?;
        info!(slug = %created.slug, "created changelog");

        let changelog =
            read_back("create changelog", || ctx.client.get_changelog(&created.slug)).await?;
        Ok(Self::state(&changelog, &planned))
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;

        match ctx.client.get_changelog(&slug).await? {
            Some(changelog) => {
                debug!(slug = %slug, revision = changelog.revision, "read changelog");
                Ok(Self::state(&changelog, &current))
            }
            None => {
                warn!(slug = %slug, "changelog no longer exists, removing it from state");
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
        let slug = identifier(&prior, "slug")?;
        let params = Self::params(&planned)?;

        let updated = ctx.client.update_changelog(&slug, &params).await?;
        info!(slug = %updated.slug, revision = updated.revision, "updated changelog");

        let changelog =
            read_back("update changelog", || ctx.client.get_changelog(&updated.slug)).await?;
        Ok(Self::state(&changelog, &planned))
    }

    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;

        if ctx.client.delete_changelog(&slug).await? {
            info!(slug = %slug, "deleted changelog");
        } else {
            debug!(slug = %slug, "changelog was already deleted");
        }
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError> {
        let slug = id.trim();
        if slug.is_empty() {
            return Err(ProviderError::Validation(
                "invalid import identifier: expected a changelog slug".to_string(),
            ));
        }

        let changelog = ctx
            .client
            .get_changelog(slug)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("changelog `{}`", slug)))?;

        let known = Snapshot::new(json!({ "body": changelog.body }));
        Ok(imported(&self.schema(), Self::state(&changelog, &known)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryReadme;
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

    #[tokio::test]
    async fn test_lifecycle() {
        let (api, ctx) = context();
        let schema = ChangelogResource.schema();
        let config = json!({"body": "---\ntitle: Shipped\ntype: added\n---\nNew things."});

        let plan = plan_resource(&schema, None, &config, &config);
        let planned = Snapshot::new(plan.planned_state.clone());
        assert_eq!(planned.known::<String>("title").as_deref(), Some("Shipped"));
        assert_eq!(planned.known::<bool>("hidden"), Some(true));

        let state = ChangelogResource
            .create(&ctx, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(state["slug"], "shipped");
        assert_eq!(state["type"], "added");
        assert_eq!(state["hidden"], true);

        let replan = plan_resource(&schema, Some(&state), &config, &config);
        assert!(replan.changes.is_empty(), "{:?}", replan.changes);

        let edited = json!({"body": "---\ntitle: Shipped\ntype: fixed\n---\nNew things."});
        let plan = plan_resource(&schema, Some(&state), &edited, &edited);
        assert!(Snapshot::new(plan.planned_state.clone()).is_unknown("revision"));
        let state = ChangelogResource
            .update(&ctx, &state, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(state["type"], "fixed");
        assert_eq!(state["revision"], 2);

        api.remove_changelog("shipped");
        assert!(ChangelogResource.read(&ctx, &state).await.unwrap().state.is_none());
        ChangelogResource.delete(&ctx, &state).await.unwrap();
    }

    #[test]
    fn test_validate() {
        let diagnostics = ChangelogResource.validate(&json!({"body": "no title"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("title"));

        let diagnostics = ChangelogResource.validate(&json!({"title": "X", "type": "broken"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("type"));
    }

    #[tokio::test]
    async fn test_import() {
        let (_api, ctx) = context();
        let config = json!({"title": "Release", "body": "Notes"});
        let plan = plan_resource(&ChangelogResource.schema(), None, &config, &config);
        ChangelogResource.create(&ctx, &plan.planned_state).await.unwrap();

        let state = ChangelogResource
            .import(&ctx, "release")
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(state["body"], "Notes");
        assert_eq!(state["title"], "Release");
    }
}
