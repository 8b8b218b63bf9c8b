//! ReadMe API request and response bodies.

use serde::{Deserialize, Serialize};

/// A documentation page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "body_html")]
    pub body_html: String,
    /// Category ID.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub order: i64,
    /// Parent doc ID.
    #[serde(default)]
    pub parent_doc: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub error: DocError,
    #[serde(default)]
    pub excerpt: String,
    /// Version ID.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_api: bool,
    #[serde(default)]
    pub is_reference: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub user: String,
}

/// The `error` object of an error-page doc.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocError {
    #[serde(default)]
    pub code: String,
}

/// Body of a doc create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocParams {
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_doc_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DocError>,
}

/// A doc as listed under a category, with its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub children: Vec<CategoryDoc>,
}

/// A doc category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub reference: bool,
    #[serde(default, rename = "type")]
    pub category_type: String,
    /// Version ID.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub created_at: String,
}

/// Body of a category create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryParams {
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub category_type: Option<String>,
}

/// A project version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(rename = "_id")]
    pub id: String,
    pub version: String,
    #[serde(default, rename = "version_clean")]
    pub version_clean: String,
    #[serde(default)]
    pub codename: String,
    #[serde(default, rename = "is_stable")]
    pub is_stable: bool,
    #[serde(default, rename = "is_beta")]
    pub is_beta: bool,
    #[serde(default, rename = "is_hidden")]
    pub is_hidden: bool,
    #[serde(default, rename = "is_deprecated")]
    pub is_deprecated: bool,
    /// ID of the version this one was forked from.
    #[serde(default, rename = "forked_from")]
    pub forked_from: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub created_at: String,
}

/// Body of a version create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionParams {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    /// The version to fork from. Required on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "is_stable", skip_serializing_if = "Option::is_none")]
    pub is_stable: Option<bool>,
    #[serde(rename = "is_beta", skip_serializing_if = "Option::is_none")]
    pub is_beta: Option<bool>,
    #[serde(rename = "is_hidden", skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
    #[serde(rename = "is_deprecated", skip_serializing_if = "Option::is_none")]
    pub is_deprecated: Option<bool>,
}

/// A changelog post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changelog {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, rename = "type")]
    pub changelog_type: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Body of a changelog create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangelogParams {
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub changelog_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// A custom page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPage {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, rename = "htmlmode")]
    pub html_mode: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Body of a custom page create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomPageParams {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(rename = "htmlmode", skip_serializing_if = "Option::is_none")]
    pub html_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// The project the API token belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub plan: String,
}

/// An uploaded API specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpecification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub last_synced: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "type")]
    pub spec_type: String,
    /// Version ID.
    #[serde(default)]
    pub version: String,
    /// The category the specification's reference pages live in.
    #[serde(default)]
    pub category: Option<CategoryRef>,
}

/// A category as embedded in other entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
}
