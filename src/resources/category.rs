//! `readme_category`: a category grouping docs within a version.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    identifier, imported, parse_import_id, read_back, version_name, Lookup, Resource,
    ResourceContext,
};
use crate::client::{Category, CategoryParams, RequestOptions};
use crate::error::ProviderError;
use crate::plan::{ChangedIf, Snapshot};
use crate::schema::{Attribute, Schema};
use crate::types::StateResult;

/// Resource type name.
pub const TYPE_NAME: &str = "readme_category";

/// Accepted values of `type`.
pub const CATEGORY_TYPES: [&str; 2] = ["guide", "reference"];

/// Manages categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryResource;

impl CategoryResource {
    fn params(planned: &Snapshot) -> Result<CategoryParams, ProviderError> {
        let title = planned
            .known::<String>("title")
            .ok_or_else(|| ProviderError::Validation("`title` must be known at apply".to_string()))?;
        Ok(CategoryParams {
            title,
            category_type: planned.known("type"),
        })
    }

    async fn state(
        &self,
        ctx: &ResourceContext,
        category: &Category,
        known: &Snapshot,
        lookup: Lookup,
    ) -> Result<StateResult, ProviderError> {
        let mut diagnostics = Vec::new();
        let version = version_name(ctx, known, &category.version, lookup, &mut diagnostics).await?;

        let state = json!({
            "id": category.id,
            "title": category.title,
            "slug": category.slug,
            "type": category.category_type,
            "order": category.order,
            "reference": category.reference,
            "version": version,
            "project": category.project,
            "created_at": category.created_at,
        });
        Ok(StateResult::new(state).with_diagnostics(diagnostics))
    }
}

#[async_trait]
impl Resource for CategoryResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A ReadMe doc category.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("title", Attribute::required_string())
            .with_attribute(
                "slug",
                Attribute::computed_string()
                    .with_description("Derived from the title by ReadMe.")
                    .with_plan_modifier(ChangedIf::<String, String>::shared("title")),
            )
            .with_attribute(
                "type",
                Attribute::optional_computed_string()
                    .with_description("`guide` or `reference`.")
                    .with_one_of(CATEGORY_TYPES),
            )
            .with_attribute("order", Attribute::computed_int64())
            .with_attribute("reference", Attribute::computed_bool())
            .with_attribute(
                "version",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_description("Project version. Defaults to the stable version."),
            )
            .with_attribute("project", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        planned: &Value,
    ) -> Result<StateResult, ProviderError> {
        let planned = Snapshot::new(planned.clone());
        let options = RequestOptions::version(planned.known::<String>("version"));
        let params = Self::params(&planned)?;

        let created = ctx.client.create_category(&params, &options).await?;
        info!(slug = %created.slug, "created category");

        let category = read_back("create category", || {
            ctx.client.get_category(&created.slug, &options)
        })
        .await?;
        self.state(ctx, &category, &planned, Lookup::BestEffort).await
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;
        let options = RequestOptions::version(current.known::<String>("version"));

        match ctx.client.get_category(&slug, &options).await? {
            Some(category) => {
                debug!(slug = %slug, "read category");
                self.state(ctx, &category, &current, Lookup::BestEffort).await
            }
            None => {
                warn!(slug = %slug, "category no longer exists, removing it from state");
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
        let options = RequestOptions::version(prior.known::<String>("version"));
        let params = Self::params(&planned)?;

        let updated = ctx.client.update_category(&slug, &params, &options).await?;
        info!(slug = %updated.slug, previous = %slug, "updated category");

        let category = read_back("update category", || {
            ctx.client.get_category(&updated.slug, &options)
        })
        .await?;
        self.state(ctx, &category, &planned, Lookup::BestEffort).await
    }

    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;
        let options = RequestOptions::version(current.known::<String>("version"));

        if ctx.client.delete_category(&slug, &options).await? {
            info!(slug = %slug, "deleted category");
        } else {
            debug!(slug = %slug, "category was already deleted");
        }
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError> {
        let (version, slug) = parse_import_id(id)?;
        let options = RequestOptions::version(version.clone());

        let category = ctx
            .client
            .get_category(&slug, &options)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("category `{}`", id)))?;

        let known = Snapshot::new(json!({ "version": version }));
        let result = self.state(ctx, &category, &known, Lookup::Required).await?;
        Ok(imported(&self.schema(), result))
    }
}
