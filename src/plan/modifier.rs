//! The plan modifier interface and the front matter default modifier.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use super::resolve::{resolve, Resolved};
use super::{Kind, PlanValue, Snapshot};
use crate::frontmatter::FrontMatterKey;
use crate::schema::{Diagnostic, Schema};

/// The attribute that holds the document body front matter is read from.
pub const BODY_ATTRIBUTE: &str = "body";

/// Everything a modifier may read while planning one attribute.
#[derive(Debug, Clone, Copy)]
pub struct ModifyRequest<'a> {
    /// The attribute being planned.
    pub attribute: &'a str,
    /// The schema being planned against.
    pub schema: &'a Schema,
    /// The resource configuration.
    pub config: &'a Snapshot,
    /// The prior state; `None` on create.
    pub prior: Option<&'a Snapshot>,
    /// The plan as it stood before any modifier ran.
    pub proposed: &'a Snapshot,
}

impl<'a> ModifyRequest<'a> {
    /// The declared default of `attribute`, if any.
    pub fn default_of(&self, attribute: &str) -> Option<&'a Value> {
        self.schema
            .attribute(attribute)
            .and_then(|attribute| attribute.default.as_ref())
    }

    /// The declared default of the attribute being planned.
    pub fn default(&self) -> Option<&'a Value> {
        self.default_of(self.attribute)
    }

    /// The current plan's document body.
    pub fn body(&self) -> PlanValue<String> {
        self.proposed.get(BODY_ATTRIBUTE)
    }

    /// Read `path` from the prior state; absent on create.
    pub fn prior<K: Kind>(&self, path: &str) -> PlanValue<K> {
        self.prior
            .map_or(PlanValue::Absent, |prior| prior.get(path))
    }
}

/// A step in an attribute's plan modifier chain.
///
/// Modifiers read from the request and write only the attribute being
/// planned. Problems are reported as diagnostics scoped to that attribute so
/// sibling attributes still get planned.
pub trait PlanModifier: Debug + Send + Sync {
    /// A short human-readable description.
    fn description(&self) -> String;

    /// Adjust the planned value of `request.attribute`.
    fn modify(
        &self,
        request: &ModifyRequest<'_>,
        planned: &mut Snapshot,
        diagnostics: &mut Vec<Diagnostic>,
    );
}

/// Fills an attribute from front matter when configuration leaves it unset.
///
/// Unresolved attributes fall back to the declared default, then to the plan
/// as proposed (the prior state for computed attributes).
#[derive(Debug)]
pub struct FrontMatterDefault<K> {
    key: FrontMatterKey,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Kind> FrontMatterDefault<K> {
    /// Resolve from `key`.
    pub fn new(key: FrontMatterKey) -> Self {
        Self {
            key,
            _kind: PhantomData,
        }
    }

    /// Resolve from `key`, boxed for a schema's modifier chain.
    pub fn shared(key: FrontMatterKey) -> Arc<dyn PlanModifier> {
        Arc::new(Self::new(key))
    }
}

impl<K: Kind> PlanModifier for FrontMatterDefault<K> {
    fn description(&self) -> String {
        format!(
            "Defaults to the `{}` front matter value when not configured.",
            self.key.block_key()
        )
    }

    fn modify(
        &self,
        request: &ModifyRequest<'_>,
        planned: &mut Snapshot,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let config = request.config.get::<K>(request.attribute);
        let resolved = match resolve(&config, &request.body(), self.key) {
            Ok(resolved) => resolved,
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error("Invalid front matter")
                        .with_detail(format!(
                            "Unable to read `{}` from the body's front matter: {}",
                            self.key.block_key(),
                            err
                        ))
                        .with_attribute(request.attribute),
                );
                return;
            }
        };

        let value = match resolved {
            Resolved::Explicit(value) | Resolved::Derived(value) => PlanValue::Present(value),
            Resolved::Deferred => PlanValue::Unknown,
            Resolved::Unresolved => match request.default().and_then(K::from_json) {
                Some(default) => PlanValue::Present(default),
                None => request.proposed.get(request.attribute),
            },
        };

        planned.set(request.attribute, value);
    }
}
