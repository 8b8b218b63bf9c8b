//! Resolution of an attribute from configuration or front matter.

use super::{Kind, PlanValue};
use crate::frontmatter::{self, FrontMatterError, FrontMatterKey};

/// Where an attribute's planned value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    /// Set in configuration.
    Explicit(T),
    /// Taken from the document's front matter.
    Derived(T),
    /// Cannot be decided until apply: the configuration value or the body is
    /// unknown.
    Deferred,
    /// Neither configuration nor front matter provide a value.
    Unresolved,
}

impl<T> Resolved<T> {
    /// The resolved value, if one was found.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Explicit(value) | Self::Derived(value) => Some(value),
            Self::Deferred | Self::Unresolved => None,
        }
    }
}

/// Resolve an attribute's effective value.
///
/// A configured value always wins. Otherwise `key` is looked up in the front
/// matter of `body`, which must be the body from the current plan. Unknown
/// boolean and integer configuration values are resolved as if absent; an
/// unknown text value defers to apply.
pub fn resolve<K: Kind>(
    config: &PlanValue<K>,
    body: &PlanValue<String>,
    key: FrontMatterKey,
) -> Result<Resolved<K>, FrontMatterError> {
    match config {
        PlanValue::Present(value) => return Ok(Resolved::Explicit(value.clone())),
        PlanValue::Unknown if !K::UNKNOWN_IS_ABSENT => return Ok(Resolved::Deferred),
        PlanValue::Unknown | PlanValue::Absent => {}
    }

    let body = match body {
        PlanValue::Present(body) => body,
        PlanValue::Unknown => return Ok(Resolved::Deferred),
        PlanValue::Absent => return Ok(Resolved::Unresolved),
    };

    Ok(match frontmatter::extract::<K>(body, key)? {
        Some(value) => Resolved::Derived(value),
        None => Resolved::Unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body(text: &str) -> PlanValue<String> {
        PlanValue::Present(text.to_string())
    }

    #[test]
    fn test_front_matter_title_used_when_unconfigured() {
        let resolved = resolve::<String>(
            &PlanValue::Absent,
            &body("---\ntitle: X\n---\nbody text"),
            FrontMatterKey::Title,
        )
        .unwrap();
        assert_eq!(resolved, Resolved::Derived("X".to_string()));
    }

    #[test]
    fn test_configured_title_wins() {
        let resolved = resolve(
            &PlanValue::Present("Y".to_string()),
            &body("---\ntitle: X\n---\nbody text"),
            FrontMatterKey::Title,
        )
        .unwrap();
        assert_eq!(resolved, Resolved::Explicit("Y".to_string()));
    }

    #[test]
    fn test_no_block_is_unresolved() {
        let resolved =
            resolve::<bool>(&PlanValue::Absent, &body("plain"), FrontMatterKey::Hidden).unwrap();
        assert_eq!(resolved, Resolved::Unresolved);

        let resolved =
            resolve::<i64>(&PlanValue::Absent, &PlanValue::Absent, FrontMatterKey::Order).unwrap();
        assert_eq!(resolved, Resolved::Unresolved);
    }

    #[test]
    fn test_unknown_config() {
        let doc = body("---\nhidden: true\norder: 4\ntitle: T\n---\n");

        let hidden = resolve::<bool>(&PlanValue::Unknown, &doc, FrontMatterKey::Hidden).unwrap();
        assert_eq!(hidden, Resolved::Derived(true));

        let order = resolve::<i64>(&PlanValue::Unknown, &doc, FrontMatterKey::Order).unwrap();
        assert_eq!(order, Resolved::Derived(4));

        let title = resolve::<String>(&PlanValue::Unknown, &doc, FrontMatterKey::Title).unwrap();
        assert_eq!(title, Resolved::Deferred);
    }

    #[test]
    fn test_unknown_body_defers() {
        let resolved =
            resolve::<String>(&PlanValue::Absent, &PlanValue::Unknown, FrontMatterKey::Title)
                .unwrap();
        assert_eq!(resolved, Resolved::Deferred);
        assert_eq!(resolved.value(), None);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let result = resolve::<String>(
            &PlanValue::Absent,
            &body("---\ntitle: unterminated"),
            FrontMatterKey::Title,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_error_ignored_when_configured() {
        let result = resolve(
            &PlanValue::Present(false),
            &body("---\nbroken"),
            FrontMatterKey::Hidden,
        );
        assert_eq!(result.unwrap(), Resolved::Explicit(false));
    }

    proptest! {
        #[test]
        fn prop_explicit_configuration_always_wins(configured in ".*", doc in ".*") {
            let resolved = resolve(
                &PlanValue::Present(configured.clone()),
                &PlanValue::Present(doc),
                FrontMatterKey::Title,
            );
            prop_assert_eq!(resolved.unwrap(), Resolved::Explicit(configured));
        }

        #[test]
        fn prop_front_matter_fallback(title in "[A-Za-z][A-Za-z0-9 ]{0,30}[A-Za-z0-9]", order in any::<i64>()) {
            let doc = format!("---\ntitle: \"{}\"\norder: {}\n---\ncontent", title, order);
            let body = PlanValue::Present(doc);

            prop_assert_eq!(
                resolve::<String>(&PlanValue::Absent, &body, FrontMatterKey::Title).unwrap(),
                Resolved::Derived(title)
            );
            prop_assert_eq!(
                resolve::<i64>(&PlanValue::Absent, &body, FrontMatterKey::Order).unwrap(),
                Resolved::Derived(order)
            );
        }

        #[test]
        fn prop_absent_without_block(doc in "[^-].*") {
            let body = PlanValue::Present(doc);
            for key in FrontMatterKey::ALL {
                prop_assert_eq!(
                    resolve::<String>(&PlanValue::Absent, &body, key).unwrap(),
                    Resolved::Unresolved
                );
            }
        }
    }
}
