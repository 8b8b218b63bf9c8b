//! `readme_doc`: a documentation page.
//!
//! Most attributes can be set either in configuration or in the front
//! matter of `body`; configuration wins. Server-computed fields that change
//! on every edit are marked unknown in the plan whenever the content they
//! depend on changes.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    check_requirements, effective, identifier, imported, parse_import_id, read_back,
    reconcile_body, version_name, Lookup, Requirement, Resource, ResourceContext,
};
use crate::client::{CategoryDoc, Doc, DocError, DocParams, RequestOptions};
use crate::error::ProviderError;
use crate::frontmatter::FrontMatterKey;
use crate::plan::{ChangedIf, FrontMatterDefault, Kind, Snapshot};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::StateResult;
use crate::validation;

/// Resource type name.
pub const TYPE_NAME: &str = "readme_doc";

/// Accepted values of `type`.
pub const DOC_TYPES: [&str; 3] = ["basic", "error", "link"];

const REQUIREMENTS: [Requirement; 2] = [
    Requirement {
        sources: &[("title", FrontMatterKey::Title)],
        summary: "Missing doc title",
        detail: "Set `title`, or `title` in the body's front matter.",
    },
    Requirement {
        sources: &[
            ("category", FrontMatterKey::Category),
            ("category_slug", FrontMatterKey::CategorySlug),
        ],
        summary: "Missing doc category",
        detail: "Set `category` or `category_slug`, or `categorySlug` in the body's front matter.",
    },
];

/// Manages docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocResource;

/// Attach the invalidation rules for fields ReadMe recomputes on every edit.
fn recomputed_on_edit<D: Kind>(attribute: Attribute) -> Attribute {
    attribute
        .with_plan_modifier(ChangedIf::<String, D>::shared("body"))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "title",
            FrontMatterKey::Title,
        ))
        .with_plan_modifier(ChangedIf::<bool, D>::shared_with_front_matter(
            "hidden",
            FrontMatterKey::Hidden,
        ))
        .with_plan_modifier(ChangedIf::<i64, D>::shared_with_front_matter(
            "order",
            FrontMatterKey::Order,
        ))
        .with_plan_modifier(ChangedIf::<String, D>::shared_with_front_matter(
            "type",
            FrontMatterKey::Type,
        ))
}

/// A text attribute that front matter can fill in.
fn from_front_matter(key: FrontMatterKey) -> Attribute {
    Attribute::optional_computed_string()
        .with_plan_modifier(FrontMatterDefault::<String>::shared(key))
}

/// Empty strings are how the API says "unset".
fn non_empty(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

impl DocResource {
    fn params(planned: &Snapshot) -> Result<DocParams, ProviderError> {
        let title = effective::<String>(planned, "title", FrontMatterKey::Title)?.ok_or_else(|| {
            ProviderError::Validation(
                "`title` must be set in configuration or in the body's front matter".to_string(),
            )
        })?;

        let category = effective(planned, "category", FrontMatterKey::Category)?
            .filter(|id: &String| !id.is_empty());
        let category_slug = effective(planned, "category_slug", FrontMatterKey::CategorySlug)?
            .filter(|slug: &String| !slug.is_empty());
        if category.is_none() && category_slug.is_none() {
            return Err(ProviderError::Validation(
                "`category` or `category_slug` must be set in configuration or in the body's front matter"
                    .to_string(),
            ));
        }

        Ok(DocParams {
            title,
            doc_type: effective(planned, "type", FrontMatterKey::Type)?,
            body: planned.known("body"),
            category,
            category_slug,
            hidden: effective(planned, "hidden", FrontMatterKey::Hidden)?,
            order: effective(planned, "order", FrontMatterKey::Order)?,
            parent_doc: effective(planned, "parent_doc", FrontMatterKey::ParentDoc)?,
            parent_doc_slug: effective(planned, "parent_doc_slug", FrontMatterKey::ParentDocSlug)?,
            error: effective::<String>(planned, "error_code", FrontMatterKey::ErrorCode)?
                .map(|code| DocError { code }),
        })
    }

    /// Map an API doc to state, resolving the slugs and version it refers to
    /// by ID. `known` supplies values already known from the plan or prior
    /// state so lookups can be skipped.
    async fn state(
        &self,
        ctx: &ResourceContext,
        doc: &Doc,
        known: &Snapshot,
        options: &RequestOptions,
        lookup: Lookup,
    ) -> Result<StateResult, ProviderError> {
        let mut diagnostics = Vec::new();

        let same_category =
            known.known::<String>("category").as_deref() == Some(doc.category.as_str());
        let category_slug = match known.known::<String>("category_slug") {
            Some(slug) if same_category => Some(slug),
            _ if doc.category.is_empty() => None,
            _ => match ctx.client.find_category_by_id(&doc.category, options).await {
                Ok(Some(category)) => Some(category.slug),
                Ok(None) => {
                    lookup.missing("category_slug", "category", &mut diagnostics)?;
                    known.known("category_slug")
                }
                Err(err) => {
                    lookup.failed("category_slug", "category", err, &mut diagnostics)?;
                    known.known("category_slug")
                }
            },
        };

        let parent_doc_slug = match &doc.parent_doc {
            None => None,
            Some(id) if id.is_empty() => None,
            Some(id) => match known.known::<String>("parent_doc_slug") {
                Some(slug) if known.known::<String>("parent_doc").as_ref() == Some(id) => Some(slug),
                _ => match ctx.client.find_doc_by_id(id, options).await {
                    Ok(Some(parent)) => Some(parent.slug),
                    Ok(None) => {
                        lookup.missing("parent_doc_slug", "parent doc", &mut diagnostics)?;
                        known.known("parent_doc_slug")
                    }
                    Err(err) => {
                        lookup.failed("parent_doc_slug", "parent doc", err, &mut diagnostics)?;
                        known.known("parent_doc_slug")
                    }
                },
            },
        };

        let version = version_name(ctx, known, &doc.version, lookup, &mut diagnostics).await?;

        // An unconfigured body is not tracked.
        let body = known
            .known::<String>("body")
            .map(|body| reconcile_body(Some(body), &doc.body));

        let state = json!({
            "id": doc.id,
            "title": doc.title,
            "slug": doc.slug,
            "body": body,
            "body_html": doc.body_html,
            "category": non_empty(&doc.category),
            "category_slug": category_slug,
            "hidden": doc.hidden,
            "order": doc.order,
            "parent_doc": doc.parent_doc.as_deref().map(non_empty),
            "parent_doc_slug": parent_doc_slug,
            "type": doc.doc_type,
            "error_code": non_empty(&doc.error.code),
            "excerpt": doc.excerpt,
            "version": version,
            "revision": doc.revision,
            "created_at": doc.created_at,
            "updated_at": doc.updated_at,
            "is_api": doc.is_api,
            "is_reference": doc.is_reference,
            "deprecated": doc.deprecated,
            "project": doc.project,
            "user": doc.user,
        });

        Ok(StateResult::new(state).with_diagnostics(diagnostics))
    }

    /// Delete the descendants of `slug`, deepest first.
    async fn destroy_children(
        &self,
        ctx: &ResourceContext,
        current: &Snapshot,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<(), ProviderError> {
        let Some(category_slug) = current.known::<String>("category_slug") else {
            warn!(slug, "doc has no known category, skipping child doc removal");
            return Ok(());
        };

        let tree = ctx.client.list_category_docs(&category_slug, options).await?;
        let Some(node) = find_node(&tree, slug) else {
            return Ok(());
        };

        let mut descendants = Vec::new();
        collect_descendants(node, &mut descendants);
        for child in descendants {
            if ctx.client.delete_doc(&child, options).await? {
                info!(parent = slug, slug = %child, "deleted child doc");
            }
        }
        Ok(())
    }
}

fn find_node<'a>(docs: &'a [CategoryDoc], slug: &str) -> Option<&'a CategoryDoc> {
    docs.iter().find_map(|doc| {
        if doc.slug == slug {
            Some(doc)
        } else {
            find_node(&doc.children, slug)
        }
    })
}

fn collect_descendants(doc: &CategoryDoc, out: &mut Vec<String>) {
    for child in &doc.children {
        collect_descendants(child, out);
        out.push(child.slug.clone());
    }
}

#[async_trait]
impl Resource for DocResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A ReadMe documentation page.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The doc ID."),
            )
            .with_attribute(
                "title",
                from_front_matter(FrontMatterKey::Title)
                    .with_description("The doc title. Defaults to `title` in the body's front matter."),
            )
            .with_attribute("slug", Attribute::computed_string())
            .with_attribute(
                "body",
                Attribute::optional_string()
                    .with_description("Markdown body, optionally starting with front matter."),
            )
            .with_attribute(
                "body_html",
                Attribute::computed_string()
                    .with_plan_modifier(ChangedIf::<String, String>::shared("body")),
            )
            .with_attribute(
                "category",
                from_front_matter(FrontMatterKey::Category)
                    .with_description("Category ID.")
                    .with_plan_modifier(ChangedIf::<String, String>::shared_with_front_matter(
                        "category_slug",
                        FrontMatterKey::CategorySlug,
                    )),
            )
            .with_attribute(
                "category_slug",
                from_front_matter(FrontMatterKey::CategorySlug)
                    .with_description("Category slug.")
                    .with_plan_modifier(ChangedIf::<String, String>::shared_with_front_matter(
                        "category",
                        FrontMatterKey::Category,
                    )),
            )
            .with_attribute(
                "hidden",
                Attribute::optional_computed_bool()
                    .with_default(json!(false))
                    .with_plan_modifier(FrontMatterDefault::<bool>::shared(FrontMatterKey::Hidden)),
            )
            .with_attribute(
                "order",
                Attribute::optional_computed_int64()
                    .with_default(json!(999))
                    .with_plan_modifier(FrontMatterDefault::<i64>::shared(FrontMatterKey::Order)),
            )
            .with_attribute(
                "parent_doc",
                from_front_matter(FrontMatterKey::ParentDoc)
                    .with_description("Parent doc ID.")
                    .with_plan_modifier(ChangedIf::<String, String>::shared_with_front_matter(
                        "parent_doc_slug",
                        FrontMatterKey::ParentDocSlug,
                    )),
            )
            .with_attribute(
                "parent_doc_slug",
                from_front_matter(FrontMatterKey::ParentDocSlug)
                    .with_description("Parent doc slug.")
                    .with_plan_modifier(ChangedIf::<String, String>::shared_with_front_matter(
                        "parent_doc",
                        FrontMatterKey::ParentDoc,
                    )),
            )
            .with_attribute(
                "type",
                from_front_matter(FrontMatterKey::Type)
                    .with_default(json!("basic"))
                    .with_one_of(DOC_TYPES),
            )
            .with_attribute(
                "error_code",
                from_front_matter(FrontMatterKey::ErrorCode)
                    .with_description("HTTP status documented by an `error` doc."),
            )
            .with_attribute(
                "excerpt",
                Attribute::computed_string()
                    .with_plan_modifier(ChangedIf::<String, String>::shared("body")),
            )
            .with_attribute(
                "version",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_description("Project version. Defaults to the stable version."),
            )
            .with_attribute("revision", recomputed_on_edit::<i64>(Attribute::computed_int64()))
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute(
                "updated_at",
                recomputed_on_edit::<String>(Attribute::computed_string()),
            )
            .with_attribute("is_api", Attribute::computed_bool())
            .with_attribute("is_reference", Attribute::computed_bool())
            .with_attribute("deprecated", Attribute::computed_bool())
            .with_attribute("project", Attribute::computed_string())
            .with_attribute("user", Attribute::computed_string())
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
        let options = RequestOptions::version(planned.known::<String>("version"));
        let params = Self::params(&planned)?;

        let created = ctx.client.create_doc(&params, &options).await?;
        info!(slug = %created.slug, "created doc");

        let doc = read_back("create doc", || ctx.client.get_doc(&created.slug, &options)).await?;
        self.state(ctx, &doc, &planned, &options, Lookup::BestEffort)
            .await
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;
        let options = RequestOptions::version(current.known::<String>("version"));

        match ctx.client.get_doc(&slug, &options).await? {
            Some(doc) => {
                debug!(slug = %slug, revision = doc.revision, "read doc");
                self.state(ctx, &doc, &current, &options, Lookup::BestEffort)
                    .await
            }
            None => {
                warn!(slug = %slug, "doc no longer exists, removing it from state");
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

        let updated = ctx.client.update_doc(&slug, &params, &options).await?;
        info!(slug = %updated.slug, revision = updated.revision, "updated doc");

        let doc = read_back("update doc", || ctx.client.get_doc(&updated.slug, &options)).await?;
        self.state(ctx, &doc, &planned, &options, Lookup::BestEffort)
            .await
    }

    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError> {
        let current = Snapshot::new(current.clone());
        let slug = identifier(&current, "slug")?;
        let options = RequestOptions::version(current.known::<String>("version"));

        if ctx.destroy_child_docs {
            self.destroy_children(ctx, &current, &slug, &options).await?;
        }

        if ctx.client.delete_doc(&slug, &options).await? {
            info!(slug = %slug, "deleted doc");
        } else {
            debug!(slug = %slug, "doc was already deleted");
        }
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError> {
        let (version, slug) = parse_import_id(id)?;
        let options = RequestOptions::version(version.clone());

        let doc = ctx
            .client
            .get_doc(&slug, &options)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("doc `{}`", id)))?;

        let known = Snapshot::new(json!({"body": doc.body, "version": version}));
        let result = self
            .state(ctx, &doc, &known, &options, Lookup::Required)
            .await?;
        Ok(imported(&self.schema(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CategoryParams, InMemoryReadme, ReadmeApi};
    use crate::plan::plan_resource;
    use crate::types::UNKNOWN_VALUE;
    use std::sync::Arc;

    async fn context() -> (InMemoryReadme, ResourceContext) {
        let api = InMemoryReadme::new();
        api.create_category(
            &CategoryParams {
                title: "Guides".to_string(),
                category_type: None,
            },
            &RequestOptions::default(),
        )
        .await
        .unwrap();
        let ctx = ResourceContext {
            client: Arc::new(api.clone()),
            destroy_child_docs: false,
        };
        (api, ctx)
    }

    async fn apply_create(ctx: &ResourceContext, config: Value) -> Value {
        let schema = DocResource.schema();
        let plan = plan_resource(&schema, None, &config, &config);
        assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
        DocResource
            .create(ctx, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_from_front_matter() {
        let (_api, ctx) = context().await;
        let state = apply_create(
            &ctx,
            json!({"body": "---\ntitle: X\ncategorySlug: guides\n---\nbody text"}),
        )
        .await;

        assert_eq!(state["title"], "X");
        assert_eq!(state["slug"], "x");
        assert_eq!(state["category_slug"], "guides");
        assert_eq!(state["version"], "1.0");
        assert_eq!(state["revision"], 1);
        assert!(!state["id"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_configured_title_beats_front_matter() {
        let (_api, ctx) = context().await;
        let state = apply_create(
            &ctx,
            json!({
                "title": "Y",
                "category_slug": "guides",
                "body": "---\ntitle: X\n---\nbody text",
            }),
        )
        .await;

        assert_eq!(state["title"], "Y");
    }

    #[tokio::test]
    async fn test_replan_after_create_is_empty() {
        let (_api, ctx) = context().await;
        let config = json!({"body": "---\ntitle: X\ncategorySlug: guides\nhidden: true\n---\nbody text"});
        let state = apply_create(&ctx, config.clone()).await;

        let plan = plan_resource(&DocResource.schema(), Some(&state), &config, &config);
        assert!(plan.changes.is_empty(), "{:?}", plan.changes);
        assert!(!plan.planned_state.to_string().contains(UNKNOWN_VALUE));
    }

    #[tokio::test]
    async fn test_front_matter_edit_invalidates_revision() {
        let (_api, ctx) = context().await;
        let config = json!({"body": "---\ntitle: X\ncategorySlug: guides\n---\nbody text"});
        let state = apply_create(&ctx, config).await;

        let edited = json!({"body": "---\ntitle: X\ncategorySlug: guides\nhidden: true\n---\nbody text"});
        let plan = plan_resource(&DocResource.schema(), Some(&state), &edited, &edited);
        let planned = Snapshot::new(plan.planned_state.clone());

        assert_eq!(planned.known::<bool>("hidden"), Some(true));
        assert!(planned.is_unknown("revision"));
        assert!(planned.is_unknown("updated_at"));

        let updated = DocResource
            .update(&ctx, &state, &plan.planned_state)
            .await
            .unwrap()
            .state
            .unwrap();
        assert_eq!(updated["hidden"], true);
        assert_eq!(updated["revision"], 2);
    }

    #[tokio::test]
    async fn test_read_missing_doc_removes_state() {
        let (api, ctx) = context().await;
        let state = apply_create(
            &ctx,
            json!({"title": "Gone", "category_slug": "guides"}),
        )
        .await;
        api.remove_doc("1.0", "gone");

        let result = DocResource.read(&ctx, &state).await.unwrap();
        assert!(result.state.is_none());
        assert!(result.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_child_docs() {
        let (api, mut ctx) = context().await;
        let parent = apply_create(&ctx, json!({"title": "Parent", "category_slug": "guides"})).await;
        apply_create(
            &ctx,
            json!({"title": "Child", "category_slug": "guides", "parent_doc_slug": "parent"}),
        )
        .await;
        apply_create(
            &ctx,
            json!({"title": "Grandchild", "category_slug": "guides", "parent_doc_slug": "child"}),
        )
        .await;

        let err = DocResource.delete(&ctx, &parent).await.unwrap_err();
        assert_eq!(err.summary(), "ReadMe API request failed");

        ctx.destroy_child_docs = true;
        DocResource.delete(&ctx, &parent).await.unwrap();
        assert_eq!(api.doc_count("1.0"), 0);
    }

    #[tokio::test]
    async fn test_import_with_version() {
        let (_api, ctx) = context().await;
        let created = apply_create(
            &ctx,
            json!({"title": "Intro", "category_slug": "guides", "body": "Hello"}),
        )
        .await;

        let imported = DocResource
            .import(&ctx, "1.0:intro")
            .await
            .unwrap()
            .state
            .unwrap();

        assert_eq!(imported["id"], created["id"]);
        assert_eq!(imported["version"], "1.0");
        assert_eq!(imported["category_slug"], "guides");
        assert_eq!(imported["body"], "Hello");

        let err = DocResource.import(&ctx, "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_a_warning() {
        let (api, ctx) = context().await;
        let state = apply_create(&ctx, json!({"title": "Intro", "category_slug": "guides"})).await;

        let mut stale = Snapshot::new(state);
        stale.set_raw("category", json!("category-old"));
        api.fail_next("list_categories", crate::client::ApiError::new(500, "boom"));

        let result = DocResource.read(&ctx, stale.as_value()).await.unwrap();
        assert!(result.state.is_some());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.diagnostics[0].is_error());
        assert_eq!(result.diagnostics[0].attribute.as_deref(), Some("category_slug"));
    }

    #[test]
    fn test_validate_requires_title_and_category() {
        let diagnostics = DocResource.validate(&json!({"body": "no front matter"}));
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attributes, vec!["title", "category_slug"]);

        let diagnostics = DocResource.validate(&json!({
            "body": "---\ntitle: X\ncategorySlug: guides\n---\n",
        }));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let diagnostics = DocResource.validate(&json!({"body": UNKNOWN_VALUE}));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let diagnostics = DocResource.validate(&json!({
            "title": "X",
            "category_slug": "guides",
            "type": "page",
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("type"));
    }
}
