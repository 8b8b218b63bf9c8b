//! Managed ReadMe entities.
//!
//! Every resource follows the same lifecycle against [`ReadmeApi`]:
//!
//! - **create** submits the planned attributes, then reads the entity back
//!   and commits what the API returned.
//! - **read** drops the entity from state when the API no longer has it.
//! - **update** submits the planned attributes, then reads back.
//! - **delete** treats an entity that is already gone as deleted.
//! - **import** reads by `[version:]slug` and fills schema defaults.
//!
//! Planning is shared: [`crate::plan::plan_resource`] runs the modifier
//! chains each resource declares in its schema.

pub mod category;
pub mod changelog;
pub mod custom_page;
pub mod doc;
pub mod version;

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::client::{ApiError, ReadmeApi};
use crate::error::ProviderError;
use crate::frontmatter::{FrontMatter, FrontMatterKey};
use crate::plan::modifier::BODY_ATTRIBUTE;
use crate::plan::{resolve, Kind, PlanValue, Resolved, Snapshot};
use crate::schema::{Diagnostic, Schema};
use crate::types::StateResult;
use crate::validation;

pub use category::CategoryResource;
pub use changelog::ChangelogResource;
pub use custom_page::CustomPageResource;
pub use doc::DocResource;
pub use version::VersionResource;

/// Attempts made to read an entity back after writing it.
pub const READ_BACK_ATTEMPTS: usize = 5;

/// What resource operations get from the configured provider.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    /// The API client, built once at configure time.
    pub client: Arc<dyn ReadmeApi>,
    /// Delete a doc's children before the doc itself.
    pub destroy_child_docs: bool,
}

/// A managed ReadMe entity type.
#[async_trait]
pub trait Resource: Send + Sync + Debug {
    /// The resource type name, e.g. `readme_doc`.
    fn type_name(&self) -> &'static str;

    /// The resource schema, including plan modifier chains.
    fn schema(&self) -> Schema;

    /// Validate a configuration before planning.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Create the entity described by `planned`.
    async fn create(
        &self,
        ctx: &ResourceContext,
        planned: &Value,
    ) -> Result<StateResult, ProviderError>;

    /// Refresh `current` from the API.
    async fn read(
        &self,
        ctx: &ResourceContext,
        current: &Value,
    ) -> Result<StateResult, ProviderError>;

    /// Update the entity from `prior` to `planned`.
    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<StateResult, ProviderError>;

    /// Delete the entity.
    async fn delete(&self, ctx: &ResourceContext, current: &Value) -> Result<(), ProviderError>;

    /// Import an existing entity by identifier.
    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<StateResult, ProviderError>;
}

/// Every resource this provider manages.
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(CategoryResource),
        Arc::new(ChangelogResource),
        Arc::new(CustomPageResource),
        Arc::new(DocResource),
        Arc::new(VersionResource),
    ]
}

/// How a failed secondary lookup is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Keep going; the attribute keeps its previous value and a warning is
    /// attached.
    BestEffort,
    /// The operation cannot produce a usable state without the value.
    Required,
}

impl Lookup {
    /// Report a failed lookup of `attribute`.
    pub(crate) fn failed(
        self,
        attribute: &str,
        what: &str,
        err: ApiError,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), ProviderError> {
        match self {
            Self::Required => Err(err.into()),
            Self::BestEffort => {
                tracing::warn!(attribute, error = %err, "unable to look up {}", what);
                diagnostics.push(
                    Diagnostic::warning(format!("Unable to look up {}", what))
                        .with_detail(err.detail())
                        .with_attribute(attribute),
                );
                Ok(())
            }
        }
    }

    /// Report a lookup of `attribute` that found nothing.
    pub(crate) fn missing(
        self,
        attribute: &str,
        what: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), ProviderError> {
        match self {
            Self::Required => Err(ProviderError::NotFound(what.to_string())),
            Self::BestEffort => {
                tracing::warn!(attribute, "{} not found", what);
                diagnostics.push(
                    Diagnostic::warning(format!("Unable to look up {}", what))
                        .with_detail(format!("No {} was found.", what))
                        .with_attribute(attribute),
                );
                Ok(())
            }
        }
    }
}

/// The value to submit for `attribute` at apply time.
///
/// Planned values win. Anything still unknown is resolved from the front
/// matter of the planned body, which is always known by apply.
pub(crate) fn effective<K: Kind>(
    planned: &Snapshot,
    attribute: &str,
    key: FrontMatterKey,
) -> Result<Option<K>, ProviderError> {
    let config = match planned.get::<K>(attribute) {
        PlanValue::Unknown => PlanValue::Absent,
        value => value,
    };
    let body = planned.get::<String>(BODY_ATTRIBUTE);
    Ok(match resolve(&config, &body, key)? {
        Resolved::Explicit(value) | Resolved::Derived(value) => Some(value),
        Resolved::Deferred | Resolved::Unresolved => None,
    })
}

/// Read a required identifier out of a state snapshot.
pub(crate) fn identifier(snapshot: &Snapshot, attribute: &str) -> Result<String, ProviderError> {
    snapshot
        .known::<String>(attribute)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ProviderError::Internal(format!("state has no `{}` to address the entity by", attribute))
        })
}

/// Split an import identifier of the form `[version:]slug`.
pub(crate) fn parse_import_id(id: &str) -> Result<(Option<String>, String), ProviderError> {
    let (version, slug) = match id.split_once(':') {
        Some((version, slug)) => (Some(version.trim().to_string()), slug.trim()),
        None => (None, id.trim()),
    };

    if slug.is_empty() || version.as_deref() == Some("") {
        return Err(ProviderError::Validation(format!(
            "invalid import identifier `{}`: expected `[version:]slug`",
            id
        )));
    }

    Ok((version, slug.to_string()))
}

/// Fill attributes the API did not return with their schema defaults.
pub(crate) fn fill_defaults(schema: &Schema, state: &mut Snapshot) {
    for (name, attribute) in &schema.block.attributes {
        let missing = !matches!(state.raw(name), Some(value) if !value.is_null());
        if let (true, Some(default)) = (missing, &attribute.default) {
            state.set_raw(name, default.clone());
        }
    }
}

/// Fill defaults into an imported state.
pub(crate) fn imported(schema: &Schema, mut result: StateResult) -> StateResult {
    if let Some(state) = result.state.take() {
        let mut state = Snapshot::new(state);
        fill_defaults(schema, &mut state);
        result.state = Some(state.into_value());
    }
    result
}

/// A value that must be configured or set in the body's front matter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Requirement {
    /// Any one of these satisfies the requirement. Diagnostics point at the
    /// last one.
    pub sources: &'static [(&'static str, FrontMatterKey)],
    pub summary: &'static str,
    pub detail: &'static str,
}

/// Check `requirements` against a configuration. Nothing is checked while
/// the body is unknown.
pub(crate) fn check_requirements(config: &Value, requirements: &[Requirement]) -> Vec<Diagnostic> {
    let config = Snapshot::new(config.clone());
    let body = config.get::<String>(BODY_ATTRIBUTE);
    if body.is_unknown() {
        return Vec::new();
    }

    let front_matter = match body.present().map(|body| FrontMatter::parse(&body)) {
        Some(Ok(front_matter)) => front_matter,
        Some(Err(err)) => {
            return vec![Diagnostic::error("Invalid front matter")
                .with_detail(err.to_string())
                .with_attribute(BODY_ATTRIBUTE)];
        }
        None => None,
    };
    let provided = |(attribute, key): &(&str, FrontMatterKey)| {
        !config.raw(attribute).map_or(true, Value::is_null)
            || front_matter
                .as_ref()
                .is_some_and(|front_matter| front_matter.get::<String>(*key).is_some())
    };

    requirements
        .iter()
        .filter(|requirement| !requirement.sources.iter().any(|source| provided(source)))
        .map(|requirement| {
            let mut diagnostic =
                Diagnostic::error(requirement.summary).with_detail(requirement.detail);
            if let Some((attribute, _)) = requirement.sources.last() {
                diagnostic = diagnostic.with_attribute(*attribute);
            }
            diagnostic
        })
        .collect()
}

/// The name of the version with ID `id`, preferring the name already known
/// in `known` state.
pub(crate) async fn version_name(
    ctx: &ResourceContext,
    known: &Snapshot,
    id: &str,
    lookup: Lookup,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<String>, ProviderError> {
    if let Some(version) = known.known::<String>("version") {
        return Ok(Some(version));
    }
    if id.is_empty() {
        return Ok(None);
    }
    match ctx.client.find_version_by_id(id).await {
        Ok(Some(version)) => Ok(Some(version.version)),
        Ok(None) => {
            lookup.missing("version", "version", diagnostics)?;
            Ok(None)
        }
        Err(err) => {
            lookup.failed("version", "version", err, diagnostics)?;
            Ok(None)
        }
    }
}

/// Keep the configured body when the API returns it unchanged or with the
/// front matter stripped; otherwise report the remote body as drift.
pub(crate) fn reconcile_body(prior: Option<String>, remote: &str) -> String {
    match prior {
        Some(prior) if prior == remote => prior,
        Some(prior) => match crate::frontmatter::strip(&prior) {
            Ok(content) if content.trim() == remote.trim() => prior,
            _ => remote.to_string(),
        },
        None => remote.to_string(),
    }
}

#[derive(Debug)]
enum ReadBack {
    Missing,
    Failed(ApiError),
}

/// Read an entity back after `action` wrote it.
///
/// Retries with exponential backoff while the API reports the entity as
/// missing, up to [`READ_BACK_ATTEMPTS`] attempts. Any failure is reported
/// as [`ProviderError::FollowUpRead`].
pub(crate) async fn read_back<T, F, Fut>(action: &str, mut fetch: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    let strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_millis(200))
        .take(READ_BACK_ATTEMPTS - 1);

    let result = RetryIf::start(
        strategy,
        || {
            let attempt = fetch();
            async move {
                match attempt.await {
                    Ok(Some(entity)) => Ok(entity),
                    Ok(None) => {
                        tracing::debug!("entity not yet readable, will retry");
                        Err(ReadBack::Missing)
                    }
                    Err(err) => Err(ReadBack::Failed(err)),
                }
            }
        },
        |err: &ReadBack| matches!(err, ReadBack::Missing),
    )
    .await;

    result.map_err(|err| {
        let source = match err {
            ReadBack::Failed(err) => err,
            ReadBack::Missing => ApiError::new(
                404,
                format!("entity still missing after {} attempts", READ_BACK_ATTEMPTS),
            ),
        };
        ProviderError::follow_up_read(action, source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::types::UNKNOWN_VALUE;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_import_id() {
        assert_eq!(parse_import_id("intro").unwrap(), (None, "intro".to_string()));
        assert_eq!(
            parse_import_id("1.0:intro").unwrap(),
            (Some("1.0".to_string()), "intro".to_string())
        );
        assert!(parse_import_id("").is_err());
        assert!(parse_import_id("1.0:").is_err());
        assert!(parse_import_id(":intro").is_err());
    }

    #[test]
    fn test_effective_resolves_unknown_from_body() {
        let planned = Snapshot::new(json!({
            "body": "---\ntitle: From Body\nhidden: true\n---\n",
            "title": UNKNOWN_VALUE,
            "hidden": false,
        }));

        let title: Option<String> = effective(&planned, "title", FrontMatterKey::Title).unwrap();
        assert_eq!(title.as_deref(), Some("From Body"));

        let hidden: Option<bool> = effective(&planned, "hidden", FrontMatterKey::Hidden).unwrap();
        assert_eq!(hidden, Some(false));

        let order: Option<i64> = effective(&planned, "order", FrontMatterKey::Order).unwrap();
        assert_eq!(order, None);
    }

    #[test]
    fn test_fill_defaults() {
        let schema = Schema::v0()
            .with_attribute("order", Attribute::optional_int64().with_default(json!(999)))
            .with_attribute("title", Attribute::optional_string());
        let mut state = Snapshot::new(json!({"title": "x", "order": null}));

        fill_defaults(&schema, &mut state);

        assert_eq!(state.as_value(), &json!({"title": "x", "order": 999}));
    }

    #[test]
    fn test_reconcile_body() {
        let configured = "---\ntitle: X\n---\nHello".to_string();
        assert_eq!(reconcile_body(Some(configured.clone()), "Hello"), configured);
        assert_eq!(reconcile_body(Some(configured.clone()), &configured), configured);
        assert_eq!(reconcile_body(Some(configured), "Changed"), "Changed");
        assert_eq!(reconcile_body(None, "Remote"), "Remote");
    }

    #[tokio::test]
    async fn test_read_back_retries_missing() {
        let calls = AtomicUsize::new(0);
        let value = read_back("create doc", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ApiError>((n >= 2).then_some(n)) }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_back_gives_up() {
        let calls = AtomicUsize::new(0);
        let err = read_back("create doc", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Option<()>, ApiError>(None) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), READ_BACK_ATTEMPTS);
        assert!(matches!(err, ProviderError::FollowUpRead { .. }));
    }

    #[tokio::test]
    async fn test_read_back_does_not_retry_failures() {
        let calls = AtomicUsize::new(0);
        let err = read_back("update doc", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Option<()>, _>(ApiError::new(500, "boom")) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.detail().starts_with("update doc succeeded but the follow-up read failed"));
    }
}
