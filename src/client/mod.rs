//! The ReadMe API as seen by resources and data sources.
//!
//! [`ReadmeApi`] is the port every resource talks to. [`http::HttpReadme`]
//! implements it against the REST API; [`memory::InMemoryReadme`] keeps
//! everything in process for tests.
//!
//! Lookups return `Ok(None)` when the entity does not exist and deletes
//! return `Ok(false)`, so callers never have to pick a 404 out of an error.

pub mod http;
pub mod memory;
#[allow(missing_docs)]
pub mod types;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use http::HttpReadme;
pub use memory::InMemoryReadme;
pub use types::*;

/// The base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "https://dash.readme.com/api/v1";

/// Header selecting the project version a request applies to.
pub const VERSION_HEADER: &str = "x-readme-version";

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// The project version to scope the request to. The API uses the
    /// project's stable version when unset.
    pub version: Option<String>,
}

impl RequestOptions {
    /// Options scoped to `version`, if any.
    pub fn version(version: Option<impl Into<String>>) -> Self {
        Self {
            version: version.map(Into::into),
        }
    }
}

/// The structured error body returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    /// Machine readable error name, e.g. `DOC_NOTFOUND`.
    #[serde(default)]
    pub error: Option<String>,
    /// Human readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Suggested fix.
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Link to further help.
    #[serde(default)]
    pub help: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("error", &self.error),
            ("message", &self.message),
            ("suggestion", &self.suggestion),
            ("help", &self.help),
        ];
        let mut first = true;
        for (name, value) in fields {
            if let Some(value) = value {
                if !first {
                    writeln!(f)?;
                }
                write!(f, "{}: {}", name, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A failed API call.
#[derive(Debug, Clone, Error)]
#[error("API request failed ({status}): {message}")]
pub struct ApiError {
    /// HTTP status, or 0 when no response was received.
    pub status: u16,
    /// The client-side description of the failure.
    pub message: String,
    /// The API's structured error, when the response carried one.
    pub body: Option<ApiErrorBody>,
}

impl ApiError {
    /// An error for an HTTP response.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// An error raised before a response was received.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Attach the API's error body.
    pub fn with_body(mut self, body: ApiErrorBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether the API reported that the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// The local error followed by the API's own error payload.
    pub fn detail(&self) -> String {
        match &self.body {
            Some(body) => format!("{}\n\n{}", self, body),
            None => self.to_string(),
        }
    }
}

/// Operations on a ReadMe project.
///
/// Docs, changelogs and custom pages are addressed by slug, versions by
/// version string.
#[async_trait]
pub trait ReadmeApi: Send + Sync + fmt::Debug {
    // Docs

    /// Fetch a doc.
    async fn get_doc(&self, slug: &str, options: &RequestOptions)
        -> Result<Option<Doc>, ApiError>;

    /// Create a doc.
    async fn create_doc(&self, params: &DocParams, options: &RequestOptions)
        -> Result<Doc, ApiError>;

    /// Update a doc.
    async fn update_doc(
        &self,
        slug: &str,
        params: &DocParams,
        options: &RequestOptions,
    ) -> Result<Doc, ApiError>;

    /// Delete a doc. Returns `false` if it did not exist.
    async fn delete_doc(&self, slug: &str, options: &RequestOptions) -> Result<bool, ApiError>;

    // Categories

    /// Fetch a category.
    async fn get_category(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Option<Category>, ApiError>;

    /// List every category.
    async fn list_categories(&self, options: &RequestOptions) -> Result<Vec<Category>, ApiError>;

    /// List the docs in a category, with their children.
    async fn list_category_docs(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CategoryDoc>, ApiError>;

    /// Create a category.
    async fn create_category(
        &self,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError>;

    /// Update a category.
    async fn update_category(
        &self,
        slug: &str,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError>;

    /// Delete a category. Returns `false` if it did not exist.
    async fn delete_category(&self, slug: &str, options: &RequestOptions)
        -> Result<bool, ApiError>;

    // Versions

    /// Fetch a version.
    async fn get_version(&self, version: &str) -> Result<Option<Version>, ApiError>;

    /// List every version.
    async fn list_versions(&self) -> Result<Vec<Version>, ApiError>;

    /// Create a version.
    async fn create_version(&self, params: &VersionParams) -> Result<Version, ApiError>;

    /// Update a version.
    async fn update_version(
        &self,
        version: &str,
        params: &VersionParams,
    ) -> Result<Version, ApiError>;

    /// Delete a version. Returns `false` if it did not exist.
    async fn delete_version(&self, version: &str) -> Result<bool, ApiError>;

    // Changelogs

    /// Fetch a changelog post.
    async fn get_changelog(&self, slug: &str) -> Result<Option<Changelog>, ApiError>;

    /// Create a changelog post.
    async fn create_changelog(&self, params: &ChangelogParams) -> Result<Changelog, ApiError>;

    /// Update a changelog post.
    async fn update_changelog(
        &self,
        slug: &str,
        params: &ChangelogParams,
    ) -> Result<Changelog, ApiError>;

    /// Delete a changelog post. Returns `false` if it did not exist.
    async fn delete_changelog(&self, slug: &str) -> Result<bool, ApiError>;

    // Custom pages

    /// Fetch a custom page.
    async fn get_custom_page(&self, slug: &str) -> Result<Option<CustomPage>, ApiError>;

    /// Create a custom page.
    async fn create_custom_page(&self, params: &CustomPageParams)
        -> Result<CustomPage, ApiError>;

    /// Update a custom page.
    async fn update_custom_page(
        &self,
        slug: &str,
        params: &CustomPageParams,
    ) -> Result<CustomPage, ApiError>;

    /// Delete a custom page. Returns `false` if it did not exist.
    async fn delete_custom_page(&self, slug: &str) -> Result<bool, ApiError>;

    // Project

    /// Fetch the project the token belongs to.
    async fn get_project(&self) -> Result<Project, ApiError>;

    /// List the project's API specifications.
    async fn list_api_specifications(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<ApiSpecification>, ApiError>;

    // Lookups shared by every implementation.

    /// Find a category by ID.
    async fn find_category_by_id(
        &self,
        id: &str,
        options: &RequestOptions,
    ) -> Result<Option<Category>, ApiError> {
        let categories = self.list_categories(options).await?;
        Ok(categories.into_iter().find(|category| category.id == id))
    }

    /// Find a doc by ID, searching every category's doc tree.
    async fn find_doc_by_id(
        &self,
        id: &str,
        options: &RequestOptions,
    ) -> Result<Option<CategoryDoc>, ApiError> {
        for category in self.list_categories(options).await? {
            let docs = self.list_category_docs(&category.slug, options).await?;
            if let Some(doc) = find_in_tree(docs, id) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    /// Find a version by ID.
    async fn find_version_by_id(&self, id: &str) -> Result<Option<Version>, ApiError> {
        let versions = self.list_versions().await?;
        Ok(versions.into_iter().find(|version| version.id == id))
    }
}

fn find_in_tree(docs: Vec<CategoryDoc>, id: &str) -> Option<CategoryDoc> {
    for doc in docs {
        if doc.id == id {
            return Some(doc);
        }
        if let Some(found) = find_in_tree(doc.children, id) {
            return Some(found);
        }
    }
    None
}
