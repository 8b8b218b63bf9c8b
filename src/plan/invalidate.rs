//! Invalidation of computed attributes when something they depend on changes.
//!
//! ReadMe recomputes fields such as `revision`, `updated_at` and rendered
//! HTML on every write that touches the document. When the attribute that
//! drives such a field changes, its prior value cannot be reused: the plan
//! must show it as unknown until apply.
//!
//! [`ChangedIf<T, D>`] is instantiated per trigger kind `T` and dependent
//! kind `D`, each one of `String`, `bool` and `i64`:
//!
//! ```
//! use hemmer_provider_readme::frontmatter::FrontMatterKey;
//! use hemmer_provider_readme::plan::ChangedIf;
//!
//! // `revision` (integer) must be recomputed when `hidden` (boolean) changes,
//! // whether it is configured or set in the body's front matter.
//! let rule = ChangedIf::<bool, i64>::with_front_matter("hidden", FrontMatterKey::Hidden);
//! # let _ = rule;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use super::modifier::{ModifyRequest, PlanModifier};
use super::{Kind, PlanValue, Snapshot};
use crate::frontmatter::{self, FrontMatterError, FrontMatterKey};
use crate::schema::Diagnostic;

/// Marks the planned attribute unknown when `dependency` changes.
///
/// With front matter checking, an unconfigured dependency is compared using
/// the value in the current body's front matter. Otherwise the configured
/// value is compared with the prior state; creating a resource is not a
/// change.
#[derive(Debug)]
pub struct ChangedIf<T, D> {
    dependency: &'static str,
    front_matter: Option<FrontMatterKey>,
    _kinds: PhantomData<fn() -> (T, D)>,
}

impl<T: Kind, D: Kind> ChangedIf<T, D> {
    /// Watch `dependency` in configuration only.
    pub fn new(dependency: &'static str) -> Self {
        Self {
            dependency,
            front_matter: None,
            _kinds: PhantomData,
        }
    }

    /// Watch `dependency`, falling back to front matter `key` when the
    /// dependency is not configured.
    pub fn with_front_matter(dependency: &'static str, key: FrontMatterKey) -> Self {
        Self {
            dependency,
            front_matter: Some(key),
            _kinds: PhantomData,
        }
    }

    /// Boxed form of [`ChangedIf::new`].
    pub fn shared(dependency: &'static str) -> Arc<dyn PlanModifier> {
        Arc::new(Self::new(dependency))
    }

    /// Boxed form of [`ChangedIf::with_front_matter`].
    pub fn shared_with_front_matter(
        dependency: &'static str,
        key: FrontMatterKey,
    ) -> Arc<dyn PlanModifier> {
        Arc::new(Self::with_front_matter(dependency, key))
    }

    /// The attribute being watched.
    pub fn dependency(&self) -> &'static str {
        self.dependency
    }

    /// Decide whether the dependency changed.
    ///
    /// Reads only configuration, prior state and the plan as proposed, never
    /// the modified plan, so repeated evaluation gives the same answer.
    pub fn changed(&self, request: &ModifyRequest<'_>) -> Result<bool, FrontMatterError> {
        let config = request.config.get::<T>(self.dependency);

        if let (Some(key), PlanValue::Absent) = (self.front_matter, &config) {
            let derived = match request.body() {
                PlanValue::Present(body) => frontmatter::extract::<T>(&body, key)?,
                PlanValue::Unknown => return Ok(false),
                PlanValue::Absent => None,
            };
            if let Some(derived) = derived {
                let proposed = request.proposed.get::<T>(self.dependency);
                return Ok(proposed != PlanValue::Present(derived));
            }

            // Neither configured nor in front matter: the dependency is planned
            // at its declared default, or carried over from the proposal.
            let Some(prior) = request.prior else {
                return Ok(false);
            };
            let planned = match request.default_of(self.dependency).and_then(T::from_json) {
                Some(default) => PlanValue::Present(default),
                None => request.proposed.get::<T>(self.dependency),
            };
            return Ok(prior.get::<T>(self.dependency) != planned);
        }

        let prior = request.prior::<T>(self.dependency);
        Ok(!prior.is_absent() && config != prior)
    }
}

impl<T: Kind, D: Kind> PlanModifier for ChangedIf<T, D> {
    fn description(&self) -> String {
        match self.front_matter {
            Some(key) => format!(
                "Recomputed when `{}` or its `{}` front matter value changes.",
                self.dependency,
                key.block_key()
            ),
            None => format!("Recomputed when `{}` changes.", self.dependency),
        }
    }

    fn modify(
        &self,
        request: &ModifyRequest<'_>,
        planned: &mut Snapshot,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        match self.changed(request) {
            Ok(true) => {
                tracing::debug!(
                    attribute = request.attribute,
                    dependency = self.dependency,
                    "dependency changed, marking attribute unknown"
                );
                planned.set::<D>(request.attribute, PlanValue::Unknown);
            }
            Ok(false) => {}
            Err(err) => diagnostics.push(
                Diagnostic::error("Invalid front matter")
                    .with_detail(format!(
                        "Unable to check whether `{}` changed: {}",
                        self.dependency, err
                    ))
                    .with_attribute(request.attribute),
            ),
        }
    }
}
