//! Front matter extraction from document bodies.
//!
//! ReadMe documents may start with a YAML metadata block delimited by `---`
//! lines. Values found there stand in for attributes that the configuration
//! leaves unset:
//!
//! ```text
//! ---
//! title: Getting Started
//! categorySlug: guides
//! hidden: false
//! ---
//! Welcome to the docs.
//! ```
//!
//! The set of recognised keys is closed ([`FrontMatterKey`]) and every key
//! has a fixed [`ValueKind`]. Lookups go through one extractor table per
//! kind (the [`FrontMatterValue`] implementations), so asking for a boolean
//! key as text simply finds nothing.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_readme::frontmatter::{extract, FrontMatterKey};
//!
//! let body = "---\ntitle: Getting Started\norder: 3\n---\nWelcome.";
//!
//! let title: Option<String> = extract(body, FrontMatterKey::Title).unwrap();
//! assert_eq!(title.as_deref(), Some("Getting Started"));
//!
//! let order: Option<i64> = extract(body, FrontMatterKey::Order).unwrap();
//! assert_eq!(order, Some(3));
//!
//! let hidden: Option<bool> = extract(body, FrontMatterKey::Hidden).unwrap();
//! assert_eq!(hidden, None);
//! ```

use serde::Deserialize;
use thiserror::Error;

/// The line that opens and closes a front matter block.
const DELIMITER: &str = "---";

/// Errors raised for structurally malformed front matter.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    /// The block was opened but never closed.
    #[error("front matter block opened with `---` is never closed")]
    Unterminated,

    /// The block is not valid YAML, is not a mapping, or holds a value of
    /// the wrong kind for a recognised key.
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The kind of value a front matter key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A string.
    Text,
    /// A boolean.
    Bool,
    /// A 64-bit integer.
    Int,
}

/// A logical key recognised in front matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrontMatterKey {
    /// `title`
    Title,
    /// `category` (category ID)
    Category,
    /// `categorySlug`
    CategorySlug,
    /// `hidden`
    Hidden,
    /// `order`
    Order,
    /// `parentDoc` (parent doc ID)
    ParentDoc,
    /// `parentDocSlug`
    ParentDocSlug,
    /// `type`
    Type,
    /// `error.code`
    ErrorCode,
    /// `html`
    Html,
    /// `htmlmode`
    HtmlMode,
    /// `body`
    Body,
}

impl FrontMatterKey {
    /// Every recognised key.
    pub const ALL: [FrontMatterKey; 12] = [
        FrontMatterKey::Title,
        FrontMatterKey::Category,
        FrontMatterKey::CategorySlug,
        FrontMatterKey::Hidden,
        FrontMatterKey::Order,
        FrontMatterKey::ParentDoc,
        FrontMatterKey::ParentDocSlug,
        FrontMatterKey::Type,
        FrontMatterKey::ErrorCode,
        FrontMatterKey::Html,
        FrontMatterKey::HtmlMode,
        FrontMatterKey::Body,
    ];

    /// The schema attribute name this key feeds.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::CategorySlug => "category_slug",
            Self::Hidden => "hidden",
            Self::Order => "order",
            Self::ParentDoc => "parent_doc",
            Self::ParentDocSlug => "parent_doc_slug",
            Self::Type => "type",
            Self::ErrorCode => "error_code",
            Self::Html => "html",
            Self::HtmlMode => "htmlmode",
            Self::Body => "body",
        }
    }

    /// The key as written inside the metadata block.
    pub fn block_key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::CategorySlug => "categorySlug",
            Self::Hidden => "hidden",
            Self::Order => "order",
            Self::ParentDoc => "parentDoc",
            Self::ParentDocSlug => "parentDocSlug",
            Self::Type => "type",
            Self::ErrorCode => "error.code",
            Self::Html => "html",
            Self::HtmlMode => "htmlmode",
            Self::Body => "body",
        }
    }

    /// The kind of value this key holds.
    pub fn kind(self) -> ValueKind {
        match self {
            Self::Hidden | Self::HtmlMode => ValueKind::Bool,
            Self::Order => ValueKind::Int,
            _ => ValueKind::Text,
        }
    }
}

/// The `error` object of an error-page document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBlock {
    /// The HTTP error code the page documents.
    #[serde(default)]
    pub code: Option<ErrorCode>,
}

/// An error code, written either as a string or as a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// `code: "404"`
    Text(String),
    /// `code: 404`
    Number(i64),
}

impl ErrorCode {
    fn to_text(&self) -> String {
        match self {
            Self::Text(code) => code.clone(),
            Self::Number(code) => code.to_string(),
        }
    }
}

/// A parsed metadata block. Keys outside the recognised set are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    /// `title`
    pub title: Option<String>,
    /// `category`
    pub category: Option<String>,
    /// `categorySlug`
    pub category_slug: Option<String>,
    /// `hidden`
    pub hidden: Option<bool>,
    /// `order`
    pub order: Option<i64>,
    /// `parentDoc`
    pub parent_doc: Option<String>,
    /// `parentDocSlug`
    pub parent_doc_slug: Option<String>,
    /// `type`
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    /// `error`
    pub error: Option<ErrorBlock>,
    /// `html`
    pub html: Option<String>,
    /// `htmlmode`
    #[serde(rename = "htmlmode")]
    pub html_mode: Option<bool>,
    /// `body`
    pub body: Option<String>,
}

impl FrontMatter {
    /// Parse the metadata block at the start of `body`.
    ///
    /// Returns `Ok(None)` when the body has no metadata block.
    pub fn parse(body: &str) -> Result<Option<Self>, FrontMatterError> {
        let Some(block) = split(body)? else {
            return Ok(None);
        };

        if block.trim().is_empty() {
            return Ok(Some(Self::default()));
        }

        Ok(Some(serde_yaml::from_str(block)?))
    }

    /// Look up a key using the extractor table for `V`'s kind.
    pub fn get<V: FrontMatterValue>(&self, key: FrontMatterKey) -> Option<V> {
        V::lookup(self, key)
    }
}

/// Extract a single key from the metadata block of `body`.
///
/// Returns `Ok(None)` when there is no block, the key is absent, the value
/// is an empty string, or the key holds a different kind than `V`.
pub fn extract<V: FrontMatterValue>(
    body: &str,
    key: FrontMatterKey,
) -> Result<Option<V>, FrontMatterError> {
    Ok(FrontMatter::parse(body)?.and_then(|front_matter| front_matter.get(key)))
}

/// Extract a text key. See [`extract`].
pub fn extract_text(body: &str, key: FrontMatterKey) -> Result<Option<String>, FrontMatterError> {
    extract(body, key)
}

/// Extract a boolean key. See [`extract`].
pub fn extract_bool(body: &str, key: FrontMatterKey) -> Result<Option<bool>, FrontMatterError> {
    extract(body, key)
}

/// Extract an integer key. See [`extract`].
pub fn extract_int(body: &str, key: FrontMatterKey) -> Result<Option<i64>, FrontMatterError> {
    extract(body, key)
}

/// Return the body with its metadata block removed.
pub fn strip(body: &str) -> Result<&str, FrontMatterError> {
    match split(body)? {
        Some(block) => {
            let rest = &body[block_end(body, block)..];
            Ok(rest.trim_start_matches(['\r', '\n']))
        }
        None => Ok(body),
    }
}

/// Locate the YAML text between the opening and closing delimiters.
fn split(body: &str) -> Result<Option<&str>, FrontMatterError> {
    let start = if body.starts_with("---\r\n") {
        5
    } else if body.starts_with("---\n") {
        4
    } else {
        return Ok(None);
    };

    let mut pos = start;
    for line in body[start..].split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Ok(Some(&body[start..pos]));
        }
        pos += line.len();
    }

    Err(FrontMatterError::Unterminated)
}

/// Byte offset just past the closing delimiter line of `block`.
fn block_end(body: &str, block: &str) -> usize {
    let closing = block.as_ptr() as usize - body.as_ptr() as usize + block.len();
    let rest = &body[closing..];
    match rest.find('\n') {
        Some(newline) => closing + newline + 1,
        None => body.len(),
    }
}

/// A value kind that can be looked up in front matter.
///
/// Each implementation is the extractor table for one [`ValueKind`].
pub trait FrontMatterValue: Sized {
    /// The kind this type represents.
    const KIND: ValueKind;

    /// Look up `key`, returning `None` if it is unset or of another kind.
    fn lookup(front_matter: &FrontMatter, key: FrontMatterKey) -> Option<Self>;
}

impl FrontMatterValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn lookup(fm: &FrontMatter, key: FrontMatterKey) -> Option<Self> {
        let value = match key {
            FrontMatterKey::Title => fm.title.clone(),
            FrontMatterKey::Category => fm.category.clone(),
            FrontMatterKey::CategorySlug => fm.category_slug.clone(),
            FrontMatterKey::ParentDoc => fm.parent_doc.clone(),
            FrontMatterKey::ParentDocSlug => fm.parent_doc_slug.clone(),
            FrontMatterKey::Type => fm.doc_type.clone(),
            FrontMatterKey::ErrorCode => fm
                .error
                .as_ref()
                .and_then(|error| error.code.as_ref())
                .map(ErrorCode::to_text),
            FrontMatterKey::Html => fm.html.clone(),
            FrontMatterKey::Body => fm.body.clone(),
            FrontMatterKey::Hidden | FrontMatterKey::Order | FrontMatterKey::HtmlMode => None,
        };
        value.filter(|text| !text.is_empty())
    }
}

impl FrontMatterValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn lookup(fm: &FrontMatter, key: FrontMatterKey) -> Option<Self> {
        match key {
            FrontMatterKey::Hidden => fm.hidden,
            FrontMatterKey::HtmlMode => fm.html_mode,
            _ => None,
        }
    }
}

impl FrontMatterValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn lookup(fm: &FrontMatter, key: FrontMatterKey) -> Option<Self> {
        match key {
            FrontMatterKey::Order => fm.order,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\n\
        title: Getting Started\n\
        category: 5f7b1c\n\
        categorySlug: guides\n\
        hidden: true\n\
        order: 7\n\
        parentDoc: 61aa\n\
        parentDocSlug: overview\n\
        type: error\n\
        error:\n  code: 404\n\
        html: <p>hi</p>\n\
        htmlmode: true\n\
        body: inline\n\
        ---\n\
        Content here.";

    #[test]
    fn test_extract_every_key() {
        assert_eq!(
            extract_text(DOC, FrontMatterKey::Title).unwrap(),
            Some("Getting Started".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::Category).unwrap(),
            Some("5f7b1c".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::CategorySlug).unwrap(),
            Some("guides".to_string())
        );
        assert_eq!(extract_bool(DOC, FrontMatterKey::Hidden).unwrap(), Some(true));
        assert_eq!(extract_int(DOC, FrontMatterKey::Order).unwrap(), Some(7));
        assert_eq!(
            extract_text(DOC, FrontMatterKey::ParentDoc).unwrap(),
            Some("61aa".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::ParentDocSlug).unwrap(),
            Some("overview".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::Type).unwrap(),
            Some("error".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::ErrorCode).unwrap(),
            Some("404".to_string())
        );
        assert_eq!(
            extract_text(DOC, FrontMatterKey::Html).unwrap(),
            Some("<p>hi</p>".to_string())
        );
        assert_eq!(extract_bool(DOC, FrontMatterKey::HtmlMode).unwrap(), Some(true));
        assert_eq!(
            extract_text(DOC, FrontMatterKey::Body).unwrap(),
            Some("inline".to_string())
        );
    }

    #[test]
    fn test_no_block_is_not_found() {
        for key in FrontMatterKey::ALL {
            assert_eq!(extract_text("# Plain document", key).unwrap(), None);
            assert_eq!(extract_bool("", key).unwrap(), None);
            assert_eq!(extract_int("title: not a block", key).unwrap(), None);
        }
    }

    #[test]
    fn test_absent_and_empty_values_are_not_found() {
        let body = "---\ntitle: \"\"\ncategorySlug:\n---\ntext";
        assert_eq!(extract_text(body, FrontMatterKey::Title).unwrap(), None);
        assert_eq!(extract_text(body, FrontMatterKey::CategorySlug).unwrap(), None);
        assert_eq!(extract_bool(body, FrontMatterKey::Hidden).unwrap(), None);
    }

    #[test]
    fn test_false_and_zero_are_found() {
        let body = "---\nhidden: false\norder: 0\n---\n";
        assert_eq!(extract_bool(body, FrontMatterKey::Hidden).unwrap(), Some(false));
        assert_eq!(extract_int(body, FrontMatterKey::Order).unwrap(), Some(0));
    }

    #[test]
    fn test_kind_mismatch_finds_nothing() {
        assert_eq!(extract_text(DOC, FrontMatterKey::Hidden).unwrap(), None);
        assert_eq!(extract_bool(DOC, FrontMatterKey::Title).unwrap(), None);
        assert_eq!(extract_int(DOC, FrontMatterKey::HtmlMode).unwrap(), None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let body = "---\nexcerpt: Short\ntitle: Hello\n---\n";
        assert_eq!(
            extract_text(body, FrontMatterKey::Title).unwrap(),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let body = "---\r\ntitle: Windows\r\nhidden: true\r\n---\r\nbody";
        assert_eq!(
            extract_text(body, FrontMatterKey::Title).unwrap(),
            Some("Windows".to_string())
        );
        assert_eq!(extract_bool(body, FrontMatterKey::Hidden).unwrap(), Some(true));
    }

    #[test]
    fn test_empty_block() {
        let parsed = FrontMatter::parse("---\n---\nbody").unwrap();
        assert_eq!(parsed, Some(FrontMatter::default()));
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        let err = extract_text("---\ntitle: Oops\nno closing line", FrontMatterKey::Title)
            .unwrap_err();
        assert!(matches!(err, FrontMatterError::Unterminated));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let err = extract_bool("---\nhidden: sometimes\n---\n", FrontMatterKey::Hidden)
            .unwrap_err();
        assert!(matches!(err, FrontMatterError::Yaml(_)));

        let err = extract_int("---\norder: [1, 2]\n---\n", FrontMatterKey::Order).unwrap_err();
        assert!(err.to_string().starts_with("invalid front matter"));
    }

    #[test]
    fn test_non_mapping_block_is_an_error() {
        assert!(FrontMatter::parse("---\n- a\n- b\n---\n").is_err());
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("---\ntitle: X\n---\nbody text").unwrap(), "body text");
        assert_eq!(strip("---\ntitle: X\n---\n\n\nbody").unwrap(), "body");
        assert_eq!(strip("no front matter").unwrap(), "no front matter");
        assert_eq!(strip("---\ntitle: X\n---").unwrap(), "");
    }

    #[test]
    fn test_key_tables_are_consistent() {
        for key in FrontMatterKey::ALL {
            assert!(!key.attribute().is_empty());
            assert!(!key.block_key().is_empty());
        }
        assert_eq!(FrontMatterKey::CategorySlug.block_key(), "categorySlug");
        assert_eq!(FrontMatterKey::CategorySlug.attribute(), "category_slug");
        assert_eq!(FrontMatterKey::Order.kind(), ValueKind::Int);
        assert_eq!(FrontMatterKey::HtmlMode.kind(), ValueKind::Bool);
        assert_eq!(FrontMatterKey::ErrorCode.kind(), ValueKind::Text);
    }
}
