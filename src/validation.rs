//! Schema validation helpers.
//!
//! Validates resource, data source and provider configuration against a
//! [`Schema`] before anything reaches the ReadMe API.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_readme::schema::{Attribute, Schema};
//! use hemmer_provider_readme::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("title", Attribute::required_string())
//!     .with_attribute(
//!         "type",
//!         Attribute::optional_string().with_one_of(["guide", "reference"]),
//!     );
//!
//! assert!(validate(&schema, &json!({"title": "Guides", "type": "guide"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"title": "Guides", "type": "tutorial"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("type".to_string()));
//! ```

use serde_json::Value;

use crate::plan::is_unknown_value;
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema};
use std::collections::BTreeMap;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - String values must be one of the declared values, if any
/// - Attributes declared as conflicting may not both be set
/// - Nested blocks are validated recursively with min/max item constraints
///
/// Values that are not yet known are accepted as-is.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(with_path(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
                path,
            ));
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, attr) in &block.attributes {
        if !is_set(obj.get(name)) {
            continue;
        }
        for other in &attr.conflicts_with {
            // Report each pair once.
            if is_set(obj.get(other)) && (name < other || !declares_conflict(block, other, name)) {
                diagnostics.push(
                    Diagnostic::error("Conflicting attributes")
                        .with_detail(format!(
                            "'{}' cannot be set together with '{}'",
                            join_path(path, name),
                            join_path(path, other)
                        ))
                        .with_attribute(join_path(path, name)),
                );
            }
        }
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

/// Whether a configuration value is set. `false` counts as unset, so a flag
/// explicitly turned off never conflicts. Unknown values are not set yet.
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(value) => !is_unknown_value(value),
    }
}

fn declares_conflict(block: &Block, name: &str, other: &str) -> bool {
    block
        .attributes
        .get(name)
        .is_some_and(|attr| attr.conflicts_with.iter().any(|c| c == other))
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) if is_unknown_value(v) => {}
        Some(v) => {
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if let (false, Some(s)) = (attr.one_of.is_empty(), v.as_str()) {
                if !attr.one_of.iter().any(|allowed| allowed == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected one of {}, got \"{}\"",
                                quoted(&attr.one_of),
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_unknown_value(value) {
        return;
    }

    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        }
    }
}

fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_attribute_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail(format!(
                            "At least {} block(s) required",
                            nested.min_items
                        ))
                        .with_attribute(path),
                );
            }
        }
        (BlockNestingMode::Single, Some(v)) => {
            validate_block(&nested.block, v, path, diagnostics);
        }
        (BlockNestingMode::List, Some(Value::Array(arr))) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        (BlockNestingMode::List, Some(v)) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn with_path(diagnostic: Diagnostic, path: &str) -> Diagnostic {
    if path.is_empty() {
        diagnostic
    } else {
        diagnostic.with_attribute(path)
    }
}

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64().is_some()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;
    use crate::types::UNKNOWN_VALUE;
    use serde_json::json;

    fn version_schema() -> Schema {
        Schema::v0()
            .with_attribute("version", Attribute::required_string())
            .with_attribute("from", Attribute::optional_string())
            .with_attribute(
                "is_stable",
                Attribute::optional_computed_bool()
                    .with_conflicts_with("is_hidden")
                    .with_conflicts_with("is_deprecated"),
            )
            .with_attribute("is_hidden", Attribute::optional_computed_bool())
            .with_attribute("is_deprecated", Attribute::optional_computed_bool())
            .with_attribute("id", Attribute::computed_string())
    }

    #[test]
    fn test_valid_input() {
        let input = json!({"version": "1.1", "from": "1.0", "is_stable": true});
        assert!(validate(&version_schema(), &input).is_empty());
        assert!(is_valid(&version_schema(), &input));
    }

    #[test]
    fn test_missing_required_attribute() {
        let diagnostics = validate(&version_schema(), &json!({"from": "1.0"}));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("version"));
        assert!(diagnostics[0].summary.contains("Missing required"));
    }

    #[test]
    fn test_computed_attributes_skipped() {
        let input = json!({"version": "1.1", "id": 42});
        assert!(validate(&version_schema(), &input).is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let diagnostics = validate(&version_schema(), &json!({"version": 11}));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid type for attribute 'version'");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Expected string, got number"));
    }

    #[test]
    fn test_unknown_values_accepted() {
        let input = json!({"version": UNKNOWN_VALUE, "is_hidden": UNKNOWN_VALUE});
        assert!(validate(&version_schema(), &input).is_empty());
    }

    #[test]
    fn test_conflicting_flags() {
        let input = json!({"version": "1.1", "is_stable": true, "is_hidden": true, "is_deprecated": true});
        let diagnostics = validate(&version_schema(), &input);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.summary == "Conflicting attributes" && d.attribute.as_deref() == Some("is_stable")));
    }

    #[test]
    fn test_false_flag_does_not_conflict() {
        let input = json!({"version": "1.1", "is_stable": true, "is_hidden": false});
        assert!(validate(&version_schema(), &input).is_empty());
    }

    #[test]
    fn test_unknown_flag_does_not_conflict() {
        let input = json!({"version": "1.1", "is_stable": UNKNOWN_VALUE, "is_hidden": true});
        assert!(validate(&version_schema(), &input).is_empty());

        let input = json!({"version": "1.1", "is_stable": true, "is_deprecated": UNKNOWN_VALUE});
        assert!(validate(&version_schema(), &input).is_empty());
    }

    #[test]
    fn test_symmetric_conflict_reported_once() {
        let schema = Schema::v0()
            .with_attribute("a", Attribute::optional_string().with_conflicts_with("b"))
            .with_attribute("b", Attribute::optional_string().with_conflicts_with("a"));

        let diagnostics = validate(&schema, &json!({"a": "x", "b": "y"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("a"));
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::optional_string().with_one_of(["basic", "error", "link"]),
        );

        assert!(validate(&schema, &json!({"type": "link"})).is_empty());

        let diagnostics = validate(&schema, &json!({"type": "page"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Expected one of \"basic\", \"error\", \"link\", got \"page\"")
        );
    }

    #[test]
    fn test_nested_single_block() {
        let schema = Schema::v0().with_block(
            "config",
            NestedBlock::single(
                Block::new().with_attribute("destroy_child_docs", Attribute::optional_bool()),
            ),
        );

        assert!(validate(&schema, &json!({"config": {"destroy_child_docs": true}})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"config": {"destroy_child_docs": "yes"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("config.destroy_child_docs"));
    }

    #[test]
    fn test_list_block_item_limits() {
        let schema = Schema::v0().with_block(
            "filter",
            NestedBlock::list(Block::new().with_attribute("title", Attribute::optional_string()))
                .with_min_items(1)
                .with_max_items(1),
        );

        assert!(validate(&schema, &json!({"filter": [{"title": "x"}]})).is_empty());
        assert_eq!(validate(&schema, &json!({})).len(), 1);
        assert_eq!(validate(&schema, &json!({"filter": [{}, {}]})).len(), 1);
        assert_eq!(validate(&schema, &json!({"filter": "x"})).len(), 1);
    }

    #[test]
    fn test_list_attribute_elements() {
        let schema = Schema::v0()
            .with_attribute("titles", Attribute::new(
                AttributeType::list(AttributeType::String),
                crate::schema::AttributeFlags::optional(),
            ));

        let diagnostics = validate(&schema, &json!({"titles": ["a", 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("titles.1"));
    }

    #[test]
    fn test_non_object_root() {
        let diagnostics = validate(&version_schema(), &json!("nope"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, None);
    }
}
