//! `readme_custom_page`: a free-form page, written in Markdown or raw HTML.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    check_requirements, effective, identifier, imported, read_back, reconcile_body, Requirement,
    Resource, ResourceContext,
};
use crate::client::{CustomPage, CustomPageParams};
use crate::error::ProviderError;
use crate::frontmatter::FrontMatterKey;
use crate::plan::{ChangedIf, FrontMatterDefault, Kind, Snapshot};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::StateResult;
use crate::validation;

/// Resource type name.
pub const TYPE_NAME: &str = "readme_custom_page";

const REQUIREMENTS: [Requirement; 1] = [Requirement {
    sources: &[("title", FrontMatterKey::Title)],
    summary: "Missing custom page title",
    detail: "Set `title`, or `title` in the body's front matter.",
}];

/// Manages custom pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomPageResource;

fn recomputed_on_edit<D: Kind>(attribute: Attribute) -> Attribute {
    attribute
        .with_plan_modifier(ChangedIf::<String, D>::shared("body"))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "title",
            FrontMatterKey::Title,
        ))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "html",
            FrontMatterKey::Html,
        ))
        .with_plan_modifier(ChangedIf::<bool, D>::shared_with_front_matter(
            "htmlmode",
            FrontMatterKey::HtmlMode,
        ))
        .with_plan_modifier(ChangedIf::<bool, D>::shared_with_front_matter(
            "hidden",
            FrontMatterKey::Hidden,
        ))
}

impl CustomPageResource {
    fn params(planned: &Snapshot) -> Result<CustomPageParams, ProviderError> {
        let title = effective::<String>(planned, "title", FrontMatterKey::Title)?.ok_or_else(|| {
            ProviderError::Validation(
                "`title` must be set in configuration or in the body's front matter".to_string(),
            )
        })?;
        let html_mode = effective::<bool>(planned, "htmlmode", FrontMatterKey::HtmlMode)?;
        // HTML is only accepted in HTML mode; otherwise ReadMe renders the body.
        let html = match html_mode {
            Some(true) => effective(planned, "html", FrontMatterKey::Html)?,
            _ => None,
        };

        Ok(CustomPageParams {
            title,
            body: planned.known("body"),
            html,
            html_mode,
            hidden: effective(planned, "hidden", FrontMatterKey::Hidden)?,
        })
    }

    fn state(page: &CustomPage, known: &Snapshot) -> StateResult {
        let body = known
            .known::<String>("body")
            .map(|body| reconcile_body(Some(body), &page.body));

        StateResult::new(json!({
            "id": page.id,
            "title": page.title,
            "slug": page.slug,
            "body": body,
            "html": page.html,
            "htmlmode": page.html_mode,
            "hidden": page.hidden,
            "fullscreen": page.fullscreen,
            "revision": page.revision,
            "created_at": page.created_at,
            "updated_at": page.updated_at,
        }))
    }
}

#[async_trait]
impl Resource for CustomPageResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A ReadMe custom page.")
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
                Attribute::optional_computed_string()
                    .with_description("Page HTML, used when `htmlmode` is enabled.")
                    .with_plan_modifier(FrontMatterDefault::<String>::shared(FrontMatterKey::Html))
                    .with_plan_modifier(ChangedIf::<String, String>::shared("body"))
                    .with_plan_modifier(ChangedIf::<bool, String>::shared_with_front_matter(
                        "htmlmode",
                        FrontMatterKey::HtmlMode,
                    )),
            )
            .with_attribute(
                "htmlmode",
                Attribute::optional_computed_bool()
                    .with_default(json!(false))
                    .with_plan_modifier(FrontMatterDefault::<bool>::shared(
                        FrontMatterKey::HtmlMode,
                    )),
            )
            .with_attribute(
                "hidden",
                Attribute::optional_computed_bool()
                    .with_default(json!(true))
                    .with_plan_modifier(FrontMatterDefault::<bool>::shared(FrontMatterKey::Hidden)),
            )
            .with_attribute("fullscreen", Attribute::computed_bool())
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

        let created = ctx.client.create_custom_page(&params).await?;
        info!(slug = %created.slug, "created custom page");

        let page =
            read_back("create custom page", || ctx.client.get_custom_page(&created.slug)).await?;
        Ok(Self::state(&page, &planned))
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;

        match ctx.client.get_custom_page(&slug).await? {
            Some(page) => {
                debug!(slug = %slug, revision = page.revision, "read custom page");
                Ok(Self::state(&page, &current))
            }
            None => {
                warn!(slug = %slug, "custom page no longer exists, removing it from state");
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

        let updated = ctx.client.update_custom_page(&slug, &params).await?;
        info!(slug = %updated.slug, revision = updated.revision, "updated custom page");

        let page =
            read_back("update custom page", || ctx.client.get_custom_page(&updated.slug)).await?;
        Ok(Self::state(&page, &planned))
    }

    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;

        if ctx.client.delete_custom_page(&slug).await? {
            info!(slug = %slug, "deleted custom page");
        } else {
            debug!(slug = %slug, "custom page was already deleted");
        }
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError> {
        let slug = id.trim();
        if slug.is_empty() {
            return Err(ProviderError::Validation(
                "invalid import identifier: expected a custom page slug".to_string(),
            ));
        }

        let page = ctx
            .client
            .get_custom_page(slug)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("custom page `{}`", slug)))?;

        let known = Snapshot::new(json!({ "body": page.body }));
        Ok(imported(&self.schema(), Self::state(&page, &known)))
    }
}
