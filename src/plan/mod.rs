//! Plan modification.
//!
//! During planning every resource attribute runs through the chain of
//! [`PlanModifier`]s declared in its schema. The modifiers in this module
//! implement the two rules that keep plans for ReadMe documents stable:
//!
//! - [`resolve`]: an attribute left unset in configuration takes its value
//!   from the document's front matter ([`FrontMatterDefault`]).
//! - [`invalidate`]: an attribute computed by the API is marked unknown when
//!   something it depends on changes ([`ChangedIf`]).
//!
//! Values are read and written through [`Snapshot`], a path-addressed view of
//! a JSON plan or state where every field is a tri-state [`PlanValue`].

pub mod engine;
pub mod invalidate;
pub mod modifier;
pub mod resolve;

pub use engine::{plan_resource, proposed_new_state};
pub use invalidate::ChangedIf;
pub use modifier::{FrontMatterDefault, ModifyRequest, PlanModifier};
pub use resolve::{resolve, Resolved};

use serde_json::{Map, Value};

use crate::frontmatter::FrontMatterValue;
use crate::types::UNKNOWN_VALUE;

/// The value of one attribute in a configuration, plan, or state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanValue<T> {
    /// A known value.
    Present(T),
    /// Null or missing.
    Absent,
    /// Not known until apply.
    Unknown,
}

impl<T> PlanValue<T> {
    /// Whether this is a known value.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Whether this is null or missing.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether this is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Borrow the known value, if any.
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Take the known value, if any.
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for PlanValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}

/// An attribute value kind: text, boolean, or integer.
pub trait Kind: FrontMatterValue + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Whether an unknown configuration value should be resolved as if it
    /// were absent.
    const UNKNOWN_IS_ABSENT: bool;

    /// Convert from JSON, returning `None` on a type mismatch.
    fn from_json(value: &Value) -> Option<Self>;

    /// Convert to JSON.
    fn to_json(&self) -> Value;
}

impl Kind for String {
    const UNKNOWN_IS_ABSENT: bool = false;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Kind for bool {
    const UNKNOWN_IS_ABSENT: bool = true;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Kind for i64 {
    const UNKNOWN_IS_ABSENT: bool = true;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

/// Whether a raw JSON value is the unknown marker.
pub fn is_unknown_value(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

/// A path-addressed view over a JSON configuration, plan, or state.
///
/// Paths are attribute names, with `.` separating nested object keys
/// (`filter.title`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    value: Value,
}

impl Snapshot {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// An empty object.
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    /// Whether the snapshot itself is null.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Borrow the underlying JSON.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Take the underlying JSON.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The raw JSON at `path`; `None` if missing.
    pub fn raw(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.value, |current, segment| current.get(segment))
    }

    /// Read `path` as a tri-state value of kind `K`.
    ///
    /// A value of the wrong type reads as absent.
    pub fn get<K: Kind>(&self, path: &str) -> PlanValue<K> {
        match self.raw(path) {
            None | Some(Value::Null) => PlanValue::Absent,
            Some(value) if is_unknown_value(value) => PlanValue::Unknown,
            Some(value) => match K::from_json(value) {
                Some(value) => PlanValue::Present(value),
                None => {
                    tracing::debug!(path, "ignoring value of unexpected type");
                    PlanValue::Absent
                }
            }
        }
    }

    /// Read `path` as a known value, treating absent and unknown alike.
    pub fn known<K: Kind>(&self, path: &str) -> Option<K> {
        self.get(path).present()
    }

    /// Whether `path` holds the unknown marker.
    pub fn is_unknown(&self, path: &str) -> bool {
        self.raw(path).is_some_and(is_unknown_value)
    }

    /// Write a tri-state value to `path`.
    pub fn set<K: Kind>(&mut self, path: &str, value: PlanValue<K>) {
        let raw = match value {
            PlanValue::Present(value) => value.to_json(),
            PlanValue::Absent => Value::Null,
            PlanValue::Unknown => Value::String(UNKNOWN_VALUE.to_string()),
        };
        self.set_raw(path, raw);
    }

    /// Write raw JSON to `path`, creating intermediate objects.
    pub fn set_raw(&mut self, path: &str, raw: Value) {
        let mut current = &mut self.value;
        for segment in path.split('.') {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return;
            };
            current = map.entry(segment.to_string()).or_insert(Value::Null);
        }
        *current = raw;
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_tri_state() {
        let snapshot = Snapshot::new(json!({
            "title": "Hello",
            "hidden": null,
            "order": UNKNOWN_VALUE,
        }));

        assert_eq!(
            snapshot.get::<String>("title"),
            PlanValue::Present("Hello".to_string())
        );
        assert_eq!(snapshot.get::<bool>("hidden"), PlanValue::Absent);
        assert_eq!(snapshot.get::<bool>("missing"), PlanValue::Absent);
        assert_eq!(snapshot.get::<i64>("order"), PlanValue::Unknown);
        assert!(snapshot.is_unknown("order"));
    }

    #[test]
    fn test_unknown_marker_is_never_present_text() {
        let snapshot = Snapshot::new(json!({ "slug": UNKNOWN_VALUE }));
        assert_eq!(snapshot.get::<String>("slug"), PlanValue::Unknown);
        assert_eq!(snapshot.known::<String>("slug"), None);
    }

    #[test]
    fn test_type_mismatch_reads_absent() {
        let snapshot = Snapshot::new(json!({ "hidden": "yes", "order": 1.5 }));
        assert_eq!(snapshot.get::<bool>("hidden"), PlanValue::Absent);
        assert_eq!(snapshot.get::<i64>("order"), PlanValue::Absent);
    }

    #[test]
    fn test_integral_float_reads_as_int() {
        let snapshot = Snapshot::new(json!({ "order": 3.0 }));
        assert_eq!(snapshot.get::<i64>("order"), PlanValue::Present(3));
    }

    #[test]
    fn test_set_values() {
        let mut snapshot = Snapshot::empty();
        snapshot.set("title", PlanValue::Present("A".to_string()));
        snapshot.set::<bool>("hidden", PlanValue::Absent);
        snapshot.set::<i64>("revision", PlanValue::Unknown);

        assert_eq!(
            snapshot.into_value(),
            json!({ "title": "A", "hidden": null, "revision": UNKNOWN_VALUE })
        );
    }

    #[test]
    fn test_nested_paths() {
        let mut snapshot = Snapshot::new(Value::Null);
        snapshot.set("filter.has_category", PlanValue::Present(true));

        assert_eq!(snapshot.get::<bool>("filter.has_category"), PlanValue::Present(true));
        assert_eq!(snapshot.raw("filter.title"), None);
        assert_eq!(snapshot.as_value(), &json!({ "filter": { "has_category": true } }));
    }

    #[test]
    fn test_plan_value_helpers() {
        let value: PlanValue<i64> = Some(5).into();
        assert!(value.is_present());
        assert_eq!(value.as_present(), Some(&5));

        let value: PlanValue<i64> = None.into();
        assert!(value.is_absent());
        assert_eq!(value.present(), None);
    }
}
