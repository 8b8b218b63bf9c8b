//! An in-process [`ReadmeApi`] for tests.
//!
//! Behaves like a small ReadMe project: slugs are derived from titles, each
//! write bumps the revision, and docs are scoped to a version. Clones share
//! state, so a test can keep a handle while a provider owns another.
//!
//! Supports:
//! - Error injection per operation ([`InMemoryReadme::fail_next`])
//! - Out-of-band deletion ([`InMemoryReadme::remove_doc`] and friends)
//! - Read-after-write lag ([`InMemoryReadme::with_read_lag`])
//! - Call tracking ([`InMemoryReadme::calls`])

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::types::*;
use super::{ApiError, ApiErrorBody, ReadmeApi, RequestOptions};

/// Timestamp given to every entity.
const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

/// The version every project starts with.
pub const STABLE_VERSION: &str = "1.0";

/// A ReadMe project held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryReadme {
    inner: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    project: Project,
    versions: BTreeMap<String, Version>,
    /// Keyed by (version, slug).
    categories: BTreeMap<(String, String), Category>,
    /// Keyed by (version, slug).
    docs: BTreeMap<(String, String), Doc>,
    changelogs: BTreeMap<String, Changelog>,
    custom_pages: BTreeMap<String, CustomPage>,
    /// Keyed by version.
    specifications: BTreeMap<String, Vec<ApiSpecification>>,
    failures: HashMap<&'static str, ApiError>,
    read_lag: u32,
    lagging: u32,
    calls: Vec<&'static str>,
}

impl Default for InMemoryReadme {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReadme {
    /// A project with a single stable version, [`STABLE_VERSION`].
    pub fn new() -> Self {
        let mut state = State {
            project: Project {
                name: "Test Project".to_string(),
                subdomain: "test-project".to_string(),
                base_url: "https://test-project.readme.io".to_string(),
                plan: "business".to_string(),
            },
            ..Default::default()
        };
        let id = state.id("version");
        state.versions.insert(
            STABLE_VERSION.to_string(),
            Version {
                id,
                version: STABLE_VERSION.to_string(),
                version_clean: STABLE_VERSION.to_string(),
                is_stable: true,
                project: "project-1".to_string(),
                release_date: TIMESTAMP.to_string(),
                created_at: TIMESTAMP.to_string(),
                ..Default::default()
            },
        );
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Report the next `n` reads after every create as not found.
    pub fn with_read_lag(self, n: u32) -> Self {
        self.state().read_lag = n;
        self
    }

    /// Fail the next call to `operation` (a [`ReadmeApi`] method name).
    pub fn fail_next(&self, operation: &'static str, err: ApiError) {
        self.state().failures.insert(operation, err);
    }

    /// The operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    /// Replace the project.
    pub fn set_project(&self, project: Project) {
        self.state().project = project;
    }

    /// Add an API specification to `version`.
    pub fn add_api_specification(&self, version: &str, specification: ApiSpecification) {
        self.state()
            .specifications
            .entry(version.to_string())
            .or_default()
            .push(specification);
    }

    /// Delete a doc behind the provider's back.
    pub fn remove_doc(&self, version: &str, slug: &str) -> Option<Doc> {
        self.state()
            .docs
            .remove(&(version.to_string(), slug.to_string()))
    }

    /// Delete a category behind the provider's back.
    pub fn remove_category(&self, version: &str, slug: &str) -> Option<Category> {
        self.state()
            .categories
            .remove(&(version.to_string(), slug.to_string()))
    }

    /// Delete a version behind the provider's back.
    pub fn remove_version(&self, version: &str) -> Option<Version> {
        self.state().versions.remove(version)
    }

    /// Delete a changelog behind the provider's back.
    pub fn remove_changelog(&self, slug: &str) -> Option<Changelog> {
        self.state().changelogs.remove(slug)
    }

    /// Delete a custom page behind the provider's back.
    pub fn remove_custom_page(&self, slug: &str) -> Option<CustomPage> {
        self.state().custom_pages.remove(slug)
    }

    /// Number of docs stored in `version`.
    pub fn doc_count(&self, version: &str) -> usize {
        self.state()
            .docs
            .keys()
            .filter(|(doc_version, _)| doc_version == version)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call, failing it if an error was injected.
    fn begin(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.state();
        state.calls.push(operation);
        let failure = state.failures.remove(operation);
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Whether a read should miss because of simulated lag.
    fn lagging_read(&mut self) -> bool {
        if self.lagging > 0 {
            self.lagging -= 1;
            return true;
        }
        false
    }

    fn created(&mut self) {
        self.lagging = self.read_lag;
    }

    /// Resolve the version a request is scoped to.
    fn version(&self, options: &RequestOptions) -> Result<Version, ApiError> {
        let name = options.version.as_deref().unwrap_or(STABLE_VERSION);
        self.versions
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("VERSION_NOTFOUND", &format!("version `{}`", name)))
    }

    fn category_by_id(&self, version: &str, id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|((v, _), category)| v == version && category.id == id)
            .map(|(_, category)| category)
    }

    fn doc_by_id(&self, version: &str, id: &str) -> Option<&Doc> {
        self.docs
            .iter()
            .find(|((v, _), doc)| v == version && doc.id == id)
            .map(|(_, doc)| doc)
    }

    fn unique_slug<T>(existing: &BTreeMap<(String, String), T>, version: &str, title: &str) -> String {
        let base = slugify(title);
        let mut slug = base.clone();
        let mut n = 1;
        while existing.contains_key(&(version.to_string(), slug.clone())) {
            slug = format!("{}-{}", base, n);
            n += 1;
        }
        slug
    }

    /// Apply doc params, resolving category and parent references.
    fn apply_doc(&self, version: &str, doc: &mut Doc, params: &DocParams) -> Result<(), ApiError> {
        doc.title = params.title.clone();
        if let Some(doc_type) = &params.doc_type {
            doc.doc_type = doc_type.clone();
        }
        if let Some(body) = &params.body {
            doc.body = body.clone();
            doc.body_html = render(body);
        }
        if let Some(hidden) = params.hidden {
            doc.hidden = hidden;
        }
        if let Some(order) = params.order {
            doc.order = order;
        }
        if let Some(error) = &params.error {
            doc.error = error.clone();
        }

        if let Some(slug) = &params.category_slug {
            let category = self
                .categories
                .get(&(version.to_string(), slug.clone()))
                .ok_or_else(|| bad_request("CATEGORY_NOTFOUND", "The category couldn't be found."))?;
            doc.category = category.id.clone();
        } else if let Some(id) = &params.category {
            let category = self
                .category_by_id(version, id)
                .ok_or_else(|| bad_request("CATEGORY_NOTFOUND", "The category couldn't be found."))?;
            doc.category = category.id.clone();
        } else if doc.category.is_empty() {
            return Err(bad_request("CATEGORY_INVALID", "A category is required."));
        }

        if let Some(slug) = &params.parent_doc_slug {
            let parent = self
                .docs
                .get(&(version.to_string(), slug.clone()))
                .ok_or_else(|| bad_request("DOC_NOTFOUND", "The parent doc couldn't be found."))?;
            doc.parent_doc = Some(parent.id.clone());
        } else if let Some(id) = &params.parent_doc {
            let parent = self
                .doc_by_id(version, id)
                .ok_or_else(|| bad_request("DOC_NOTFOUND", "The parent doc couldn't be found."))?;
            doc.parent_doc = Some(parent.id.clone());
        }
        Ok(())
    }

    fn tree(&self, version: &str, category: &str, parent: Option<&str>) -> Vec<CategoryDoc> {
        self.docs
            .iter()
            .filter(|((v, _), doc)| {
                v == version && doc.category == category && doc.parent_doc.as_deref() == parent
            })
            .map(|(_, doc)| CategoryDoc {
                id: doc.id.clone(),
                title: doc.title.clone(),
                slug: doc.slug.clone(),
                order: doc.order,
                hidden: doc.hidden,
                children: self.tree(version, category, Some(&doc.id)),
            })
            .collect()
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn render(body: &str) -> String {
    let content = crate::frontmatter::strip(body).unwrap_or(body);
    format!("<div class=\"markdown-body\">{}</div>", content.trim())
}

fn not_found(error: &str, what: &str) -> ApiError {
    ApiError::new(404, format!("{} not found", what)).with_body(ApiErrorBody {
        error: Some(error.to_string()),
        message: Some(format!("The {} couldn't be found.", what)),
        ..Default::default()
    })
}

fn bad_request(error: &str, message: &str) -> ApiError {
    ApiError::new(400, message).with_body(ApiErrorBody {
        error: Some(error.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    })
}

#[async_trait]
impl ReadmeApi for InMemoryReadme {
    async fn get_doc(&self, slug: &str, options: &RequestOptions) -> Result<Option<Doc>, ApiError> {
        let mut state = self.begin("get_doc")?;
        let Ok(version) = state.version(options) else {
            return Ok(None);
        };
        if state.lagging_read() {
            return Ok(None);
        }
        Ok(state.docs.get(&(version.version, slug.to_string())).cloned())
    }

    async fn create_doc(&self, params: &DocParams, options: &RequestOptions) -> Result<Doc, ApiError> {
        let mut state = self.begin("create_doc")?;
        let version = state.version(options)?;
        if params.title.is_empty() {
            return Err(bad_request("DOC_INVALID", "Title is required."));
        }

        let mut doc = Doc {
            id: state.id("doc"),
            slug: State::unique_slug(&state.docs, &version.version, &params.title),
            doc_type: "basic".to_string(),
            order: 999,
            version: version.id.clone(),
            revision: 1,
            created_at: TIMESTAMP.to_string(),
            updated_at: TIMESTAMP.to_string(),
            project: version.project.clone(),
            user: "user-1".to_string(),
            ..Default::default()
        };
        state.apply_doc(&version.version, &mut doc, params)?;

        state
            .docs
            .insert((version.version, doc.slug.clone()), doc.clone());
        state.created();
        Ok(doc)
    }

    async fn update_doc(
        &self,
        slug: &str,
        params: &DocParams,
        options: &RequestOptions,
    ) -> Result<Doc, ApiError> {
        let mut state = self.begin("update_doc")?;
        let version = state.version(options)?;
        let key = (version.version.clone(), slug.to_string());
        let mut doc = state
            .docs
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("DOC_NOTFOUND", &format!("doc `{}`", slug)))?;

        state.apply_doc(&version.version, &mut doc, params)?;
        doc.revision += 1;
        state.docs.insert(key, doc.clone());
        Ok(doc)
    }

    async fn delete_doc(&self, slug: &str, options: &RequestOptions) -> Result<bool, ApiError> {
        let mut state = self.begin("delete_doc")?;
        let version = state.version(options)?;
        let key = (version.version, slug.to_string());
        let Some(doc) = state.docs.get(&key) else {
            return Ok(false);
        };
        let id = doc.id.clone();
        if state
            .docs
            .values()
            .any(|child| child.parent_doc.as_deref() == Some(id.as_str()))
        {
            return Err(bad_request(
                "DOC_HAS_CHILDREN",
                "Doc has children and can't be deleted.",
            ));
        }
        state.docs.remove(&key);
        Ok(true)
    }

    async fn get_category(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Option<Category>, ApiError> {
        let mut state = self.begin("get_category")?;
        let Ok(version) = state.version(options) else {
            return Ok(None);
        };
        if state.lagging_read() {
            return Ok(None);
        }
        Ok(state
            .categories
            .get(&(version.version, slug.to_string()))
            .cloned())
    }

    async fn list_categories(&self, options: &RequestOptions) -> Result<Vec<Category>, ApiError> {
        let state = self.begin("list_categories")?;
        let version = state.version(options)?;
        Ok(state
            .categories
            .iter()
            .filter(|((v, _), _)| *v == version.version)
            .map(|(_, category)| category.clone())
            .collect())
    }

    async fn list_category_docs(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CategoryDoc>, ApiError> {
        let state = self.begin("list_category_docs")?;
        let version = state.version(options)?;
        let Some(category) = state
            .categories
            .get(&(version.version.clone(), slug.to_string()))
        else {
            return Ok(Vec::new());
        };
        Ok(state.tree(&version.version, &category.id, None))
    }

    async fn create_category(
        &self,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError> {
        let mut state = self.begin("create_category")?;
        let version = state.version(options)?;
        if params.title.is_empty() {
            return Err(bad_request("CATEGORY_INVALID", "Title is required."));
        }

        let category_type = params.category_type.clone().unwrap_or_else(|| "guide".to_string());
        let category = Category {
            id: state.id("category"),
            title: params.title.clone(),
            slug: State::unique_slug(&state.categories, &version.version, &params.title),
            order: 9999,
            reference: category_type == "reference",
            category_type,
            version: version.id.clone(),
            project: version.project.clone(),
            created_at: TIMESTAMP.to_string(),
        };
        state
            .categories
            .insert((version.version, category.slug.clone()), category.clone());
        state.created();
        Ok(category)
    }

    async fn update_category(
        &self,
        slug: &str,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError> {
        let mut state = self.begin("update_category")?;
        let version = state.version(options)?;
        let key = (version.version.clone(), slug.to_string());
        let mut category = state
            .categories
            .remove(&key)
            .ok_or_else(|| not_found("CATEGORY_NOTFOUND", &format!("category `{}`", slug)))?;

        if category.title != params.title {
            category.title = params.title.clone();
            category.slug = State::unique_slug(&state.categories, &version.version, &params.title);
        }
        if let Some(category_type) = &params.category_type {
            category.reference = category_type == "reference";
            category.category_type = category_type.clone();
        }
        state
            .categories
            .insert((version.version, category.slug.clone()), category.clone());
        Ok(category)
    }

    async fn delete_category(&self, slug: &str, options: &RequestOptions) -> Result<bool, ApiError> {
        let mut state = self.begin("delete_category")?;
        let version = state.version(options)?;
        Ok(state
            .categories
            .remove(&(version.version, slug.to_string()))
            .is_some())
    }

    async fn get_version(&self, version: &str) -> Result<Option<Version>, ApiError> {
        let mut state = self.begin("get_version")?;
        if state.lagging_read() {
            return Ok(None);
        }
        Ok(state.versions.get(version).cloned())
    }

    async fn list_versions(&self) -> Result<Vec<Version>, ApiError> {
        let state = self.begin("list_versions")?;
        Ok(state.versions.values().cloned().collect())
    }

    async fn create_version(&self, params: &VersionParams) -> Result<Version, ApiError> {
        let mut state = self.begin("create_version")?;
        if state.versions.contains_key(&params.version) {
            return Err(bad_request("VERSION_DUPLICATE", "The version already exists."));
        }
        let from = params
            .from
            .as_deref()
            .and_then(|from| state.versions.get(from))
            .cloned()
            .ok_or_else(|| bad_request("VERSION_FORK_EMPTY", "The version to fork from is required."))?;

        let version = Version {
            id: state.id("version"),
            version: params.version.clone(),
            version_clean: params.version.trim_start_matches('v').to_string(),
            codename: params.codename.clone().unwrap_or_default(),
            is_stable: params.is_stable.unwrap_or(false),
            is_beta: params.is_beta.unwrap_or(false),
            is_hidden: params.is_hidden.unwrap_or(false),
            is_deprecated: params.is_deprecated.unwrap_or(false),
            forked_from: from.id,
            project: from.project,
            release_date: TIMESTAMP.to_string(),
            created_at: TIMESTAMP.to_string(),
        };
        if version.is_stable {
            for other in state.versions.values_mut() {
                other.is_stable = false;
            }
        }
        state
            .versions
            .insert(version.version.clone(), version.clone());
        state.created();
        Ok(version)
    }

    async fn update_version(
        &self,
        version: &str,
        params: &VersionParams,
    ) -> Result<Version, ApiError> {
        let mut state = self.begin("update_version")?;
        let mut existing = state
            .versions
            .remove(version)
            .ok_or_else(|| not_found("VERSION_NOTFOUND", &format!("version `{}`", version)))?;

        existing.version = params.version.clone();
        existing.version_clean = params.version.trim_start_matches('v').to_string();
        if let Some(codename) = &params.codename {
            existing.codename = codename.clone();
        }
        if let Some(is_stable) = params.is_stable {
            if is_stable {
                for other in state.versions.values_mut() {
                    other.is_stable = false;
                }
            }
            existing.is_stable = is_stable;
        }
        if let Some(is_beta) = params.is_beta {
            existing.is_beta = is_beta;
        }
        if let Some(is_hidden) = params.is_hidden {
            existing.is_hidden = is_hidden;
        }
        if let Some(is_deprecated) = params.is_deprecated {
            existing.is_deprecated = is_deprecated;
        }
        state
            .versions
            .insert(existing.version.clone(), existing.clone());
        Ok(existing)
    }

    async fn delete_version(&self, version: &str) -> Result<bool, ApiError> {
        let mut state = self.begin("delete_version")?;
        if state.versions.get(version).is_some_and(|v| v.is_stable) {
            return Err(bad_request(
                "VERSION_CANT_REMOVE_STABLE",
                "The stable version can't be removed.",
            ));
        }
        Ok(state.versions.remove(version).is_some())
    }

    async fn get_changelog(&self, slug: &str) -> Result<Option<Changelog>, ApiError> {
        let mut state = self.begin("get_changelog")?;
        if state.lagging_read() {
            return Ok(None);
        }
        Ok(state.changelogs.get(slug).cloned())
    }

    async fn create_changelog(&self, params: &ChangelogParams) -> Result<Changelog, ApiError> {
        let mut state = self.begin("create_changelog")?;
        if params.title.is_empty() {
            return Err(bad_request("CHANGELOG_INVALID", "Title is required."));
        }
        let mut slug = slugify(&params.title);
        let base = slug.clone();
        let mut n = 1;
        while state.changelogs.contains_key(&slug) {
            slug = format!("{}-{}", base, n);
            n += 1;
        }
        let body = params.body.clone().unwrap_or_default();
        let changelog = Changelog {
            id: state.id("changelog"),
            title: params.title.clone(),
            slug,
            html: render(&body),
            body,
            changelog_type: params.changelog_type.clone().unwrap_or_default(),
            hidden: params.hidden.unwrap_or(true),
            revision: 1,
            created_at: TIMESTAMP.to_string(),
            updated_at: TIMESTAMP.to_string(),
        };
        state
            .changelogs
            .insert(changelog.slug.clone(), changelog.clone());
        state.created();
        Ok(changelog)
    }

    async fn update_changelog(
        &self,
        slug: &str,
        params: &ChangelogParams,
    ) -> Result<Changelog, ApiError> {
        let mut state = self.begin("update_changelog")?;
        let changelog = state
            .changelogs
            .get_mut(slug)
            .ok_or_else(|| not_found("CHANGELOG_NOTFOUND", &format!("changelog `{}`", slug)))?;

        changelog.title = params.title.clone();
        if let Some(changelog_type) = &params.changelog_type {
            changelog.changelog_type = changelog_type.clone();
        }
        if let Some(body) = &params.body {
            changelog.html = render(body);
            changelog.body = body.clone();
        }
        if let Some(hidden) = params.hidden {
            changelog.hidden = hidden;
        }
        changelog.revision += 1;
        Ok(changelog.clone())
    }

    async fn delete_changelog(&self, slug: &str) -> Result<bool, ApiError> {
        let mut state = self.begin("delete_changelog")?;
        Ok(state.changelogs.remove(slug).is_some())
    }

    async fn get_custom_page(&self, slug: &str) -> Result<Option<CustomPage>, ApiError> {
        let mut state = self.begin("get_custom_page")?;
        if state.lagging_read() {
            return Ok(None);
        }
        Ok(state.custom_pages.get(slug).cloned())
    }

    async fn create_custom_page(&self, params: &CustomPageParams) -> Result<CustomPage, ApiError> {
        let mut state = self.begin("create_custom_page")?;
        if params.title.is_empty() {
            return Err(bad_request("CUSTOMPAGE_INVALID", "Title is required."));
        }
        let mut slug = slugify(&params.title);
        let base = slug.clone();
        let mut n = 1;
        while state.custom_pages.contains_key(&slug) {
            slug = format!("{}-{}", base, n);
            n += 1;
        }
        let body = params.body.clone().unwrap_or_default();
        let html_mode = params.html_mode.unwrap_or(false);
        let html = match (&params.html, html_mode) {
            (Some(html), true) => html.clone(),
            _ => render(&body),
        };
        let page = CustomPage {
            id: state.id("custompage"),
            title: params.title.clone(),
            slug,
            body,
            html,
            html_mode,
            hidden: params.hidden.unwrap_or(true),
            revision: 1,
            fullscreen: false,
            created_at: TIMESTAMP.to_string(),
            updated_at: TIMESTAMP.to_string(),
        };
        state.custom_pages.insert(page.slug.clone(), page.clone());
        state.created();
        Ok(page)
    }

    async fn update_custom_page(
        &self,
        slug: &str,
        params: &CustomPageParams,
    ) -> Result<CustomPage, ApiError> {
        let mut state = self.begin("update_custom_page")?;
        let page = state
            .custom_pages
            .get_mut(slug)
            .ok_or_else(|| not_found("CUSTOMPAGE_NOTFOUND", &format!("custom page `{}`", slug)))?;

        page.title = params.title.clone();
        if let Some(body) = &params.body {
            page.body = body.clone();
        }
        if let Some(html_mode) = params.html_mode {
            page.html_mode = html_mode;
        }
        if let Some(hidden) = params.hidden {
            page.hidden = hidden;
        }
        page.html = match (&params.html, page.html_mode) {
            (Some(html), true) => html.clone(),
            _ => render(&page.body),
        };
        page.revision += 1;
        Ok(page.clone())
    }

    async fn delete_custom_page(&self, slug: &str) -> Result<bool, ApiError> {
        let mut state = self.begin("delete_custom_page")?;
        Ok(state.custom_pages.remove(slug).is_some())
    }

    async fn get_project(&self) -> Result<Project, ApiError> {
        let state = self.begin("get_project")?;
        Ok(state.project.clone())
    }

    async fn list_api_specifications(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<ApiSpecification>, ApiError> {
        let state = self.begin("list_api_specifications")?;
        let version = state.version(options)?;
        Ok(state
            .specifications
            .get(&version.version)
            .cloned()
            .unwrap_or_default())
    }
}
