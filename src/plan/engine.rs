//! Planning a resource from its schema.
//!
//! Planning happens in three steps:
//!
//! 1. Build the proposed new state from configuration and prior state
//!    ([`proposed_new_state`]).
//! 2. Run each attribute's plan modifier chain against that proposal.
//! 3. Diff the result against the prior state.

use serde_json::Value;

use super::modifier::ModifyRequest;
use super::Snapshot;
use crate::schema::{Diagnostic, Schema};
use crate::types::{AttributeChange, PlanResult, UNKNOWN_VALUE};

/// Build the proposed new state for a resource.
///
/// Configured values are taken as-is. An unset computed attribute carries its
/// prior value forward, null included, and is unknown when the prior state
/// does not record it. An unset
/// configurable attribute takes its declared default.
pub fn proposed_new_state(schema: &Schema, prior: Option<&Value>, config: &Value) -> Snapshot {
    let config = Snapshot::new(config.clone());
    let prior = prior.map(|prior| Snapshot::new(prior.clone()));
    let mut proposed = Snapshot::empty();

    for (name, attribute) in &schema.block.attributes {
        let configured = config.raw(name).filter(|value| !value.is_null());
        let value = match configured {
            Some(value) => value.clone(),
            None if attribute.flags.computed => prior
                .as_ref()
                .and_then(|prior| prior.raw(name))
                .cloned()
                .unwrap_or_else(|| Value::String(UNKNOWN_VALUE.to_string())),
            None => attribute.default.clone().unwrap_or(Value::Null),
        };
        proposed.set_raw(name, value);
    }

    for name in schema.block.blocks.keys() {
        let value = config.raw(name).cloned().unwrap_or(Value::Null);
        proposed.set_raw(name, value);
    }

    proposed
}

/// Plan a resource.
///
/// A null configuration or proposal plans its destruction. Otherwise the
/// host's proposal is rebuilt from configuration and prior state, every
/// attribute's plan modifiers run against it, and the result is diffed
/// against `prior`.
pub fn plan_resource(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: &Value,
    config: &Value,
) -> PlanResult {
    let prior = prior.filter(|prior| !prior.is_null());

    if config.is_null() || proposed.is_null() {
        let changes = prior
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(path, value)| AttributeChange::new(path, Some(value.clone()), None))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let config_snapshot = Snapshot::new(config.clone());
    let prior_snapshot = prior.map(|prior| Snapshot::new(prior.clone()));
    let proposed = proposed_new_state(schema, prior, config);

    let mut planned = proposed.clone();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for (name, attribute) in &schema.block.attributes {
        let request = ModifyRequest {
            attribute: name,
            schema,
            config: &config_snapshot,
            prior: prior_snapshot.as_ref(),
            proposed: &proposed,
        };
        for modifier in &attribute.plan_modifiers {
            modifier.modify(&request, &mut planned, &mut diagnostics);
        }
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    let names = schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys());

    for name in names {
        let before = prior_snapshot
            .as_ref()
            .and_then(|prior| prior.raw(name))
            .filter(|value| !value.is_null());
        let after = planned.raw(name).filter(|value| !value.is_null());
        if before == after {
            continue;
        }

        let force_new = schema
            .attribute(name)
            .is_some_and(|attribute| attribute.force_new);
        if force_new && prior.is_some() {
            requires_replace = true;
        }
        changes.push(AttributeChange::new(name, before.cloned(), after.cloned()));
    }

    tracing::debug!(
        changes = changes.len(),
        requires_replace,
        diagnostics = diagnostics.len(),
        "planned resource"
    );

    PlanResult::with_changes(planned.into_value(), changes, requires_replace)
        .with_diagnostics(diagnostics)
}
