//! [`ReadmeApi`] over HTTP.
//!
//! Requests authenticate with HTTP basic auth, the API token as the user
//! name and no password. List endpoints are paged with `perPage`/`page`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::*;
use super::{ApiError, ApiErrorBody, ReadmeApi, RequestOptions, VERSION_HEADER};

/// Page size requested from list endpoints.
const PAGE_SIZE: usize = 100;

/// A ReadMe API client.
#[derive(Clone)]
pub struct HttpReadme {
    http_client: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl std::fmt::Debug for HttpReadme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReadme")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpReadme {
    /// Create a client for the API at `base_url`.
    ///
    /// Fails if `base_url` is not an absolute URL that paths can be
    /// appended to.
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, ApiError> {
        let invalid = |reason: String| {
            ApiError::transport(format!("invalid API URL `{}`: {}", base_url, reason))
        };
        let mut base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        base_url
            .path_segments_mut()
            .map_err(|()| invalid("it cannot have a path".to_string()))?
            .pop_if_empty();

        Ok(Self {
            http_client: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The URL of `path` below the base URL, each segment percent-encoded.
    fn url(&self, path: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path);
        }
        url
    }

    fn request(&self, method: Method, path: &[&str], options: &RequestOptions) -> RequestBuilder {
        let url = self.url(path);
        let builder = self
            .http_client
            .request(method, url)
            .basic_auth(self.token.expose_secret(), Option::<&str>::None)
            .header(reqwest::header::ACCEPT, "application/json");

        match &options.version {
            Some(version) => builder.header(VERSION_HEADER, version),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("unable to {}: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let mut err = ApiError::new(status.as_u16(), format!("unable to {}", action));
        if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text) {
            err = err.with_body(body);
        } else if !text.is_empty() {
            err.message = format!("unable to {}: {}", action, text);
        }
        tracing::debug!(status = status.as_u16(), action, "API request failed");
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| {
            ApiError::new(status, format!("unable to decode response to {}: {}", action, e))
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &[&str],
        options: &RequestOptions,
        action: &str,
    ) -> Result<Option<T>, ApiError> {
        match self.send(self.request(Method::GET, path, options), action).await {
            Ok(response) => Ok(Some(Self::decode(response, action).await?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        body: &B,
        options: &RequestOptions,
        action: &str,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, path, options).json(body);
        let response = self.send(builder, action).await?;
        Self::decode(response, action).await
    }

    async fn delete(
        &self,
        path: &[&str],
        options: &RequestOptions,
        action: &str,
    ) -> Result<bool, ApiError> {
        match self.send(self.request(Method::DELETE, path, options), action).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &[&str],
        options: &RequestOptions,
        action: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let builder = self
                .request(Method::GET, path, options)
                .query(&[("perPage", PAGE_SIZE), ("page", page)]);
            let response = self.send(builder, action).await?;
            let batch: Vec<T> = Self::decode(response, action).await?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                return Ok(items);
            }
            page += 1;
        }
    }
}

#[async_trait]
impl ReadmeApi for HttpReadme {
    async fn get_doc(&self, slug: &str, options: &RequestOptions) -> Result<Option<Doc>, ApiError> {
        self.get(&["docs", slug], options, "get doc")
            .await
    }

    async fn create_doc(&self, params: &DocParams, options: &RequestOptions) -> Result<Doc, ApiError> {
        self.write(Method::POST, &["docs"], params, options, "create doc")
            .await
    }

    async fn update_doc(
        &self,
        slug: &str,
        params: &DocParams,
        options: &RequestOptions,
    ) -> Result<Doc, ApiError> {
        let path = ["docs", slug];
        self.write(Method::PUT, &path, params, options, "update doc")
            .await
    }

    async fn delete_doc(&self, slug: &str, options: &RequestOptions) -> Result<bool, ApiError> {
        self.delete(&["docs", slug], options, "delete doc")
            .await
    }

    async fn get_category(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Option<Category>, ApiError> {
        self.get(&["categories", slug], options, "get category")
            .await
    }

    async fn list_categories(&self, options: &RequestOptions) -> Result<Vec<Category>, ApiError> {
        self.list(&["categories"], options, "list categories").await
    }

    async fn list_category_docs(
        &self,
        slug: &str,
        options: &RequestOptions,
    ) -> Result<Vec<CategoryDoc>, ApiError> {
        let path = ["categories", slug, "docs"];
        match self.send(self.request(Method::GET, &path, options), "list category docs").await {
            Ok(response) => Self::decode(response, "list category docs").await,
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn create_category(
        &self,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError> {
        self.write(Method::POST, &["categories"], params, options, "create category")
            .await
    }

    async fn update_category(
        &self,
        slug: &str,
        params: &CategoryParams,
        options: &RequestOptions,
    ) -> Result<Category, ApiError> {
        let path = ["categories", slug];
        self.write(Method::PUT, &path, params, options, "update category")
            .await
    }

    async fn delete_category(&self, slug: &str, options: &RequestOptions) -> Result<bool, ApiError> {
        let path = ["categories", slug];
        self.delete(&path, options, "delete category").await
    }

    async fn get_version(&self, version: &str) -> Result<Option<Version>, ApiError> {
        let path = ["version", version];
        self.get(&path, &RequestOptions::default(), "get version")
            .await
    }

    async fn list_versions(&self) -> Result<Vec<Version>, ApiError> {
        let response = self
            .send(
                self.request(Method::GET, &["version"], &RequestOptions::default()),
                "list versions",
            )
            .await?;
        Self::decode(response, "list versions").await
    }

    async fn create_version(&self, params: &VersionParams) -> Result<Version, ApiError> {
        let options = RequestOptions::default();
        self.write(Method::POST, &["version"], params, &options, "create version")
            .await
    }

    async fn update_version(
        &self,
        version: &str,
        params: &VersionParams,
    ) -> Result<Version, ApiError> {
        let path = ["version", version];
        let options = RequestOptions::default();
        self.write(Method::PUT, &path, params, &options, "update version")
            .await
    }

    async fn delete_version(&self, version: &str) -> Result<bool, ApiError> {
        let path = ["version", version];
        self.delete(&path, &RequestOptions::default(), "delete version")
            .await
    }

    async fn get_changelog(&self, slug: &str) -> Result<Option<Changelog>, ApiError> {
        let path = ["changelogs", slug];
        self.get(&path, &RequestOptions::default(), "get changelog")
            .await
    }

    async fn create_changelog(&self, params: &ChangelogParams) -> Result<Changelog, ApiError> {
        let options = RequestOptions::default();
        self.write(Method::POST, &["changelogs"], params, &options, "create changelog")
            .await
    }

    async fn update_changelog(
        &self,
        slug: &str,
        params: &ChangelogParams,
    ) -> Result<Changelog, ApiError> {
        let path = ["changelogs", slug];
        let options = RequestOptions::default();
        self.write(Method::PUT, &path, params, &options, "update changelog")
            .await
    }

    async fn delete_changelog(&self, slug: &str) -> Result<bool, ApiError> {
        let path = ["changelogs", slug];
        self.delete(&path, &RequestOptions::default(), "delete changelog")
            .await
    }

    async fn get_custom_page(&self, slug: &str) -> Result<Option<CustomPage>, ApiError> {
        let path = ["custompages", slug];
        self.get(&path, &RequestOptions::default(), "get custom page")
            .await
    }

    async fn create_custom_page(&self, params: &CustomPageParams) -> Result<CustomPage, ApiError> {
        let options = RequestOptions::default();
        self.write(Method::POST, &["custompages"], params, &options, "create custom page")
            .await
    }

    async fn update_custom_page(
        &self,
        slug: &str,
        params: &CustomPageParams,
    ) -> Result<CustomPage, ApiError> {
        let path = ["custompages", slug];
        let options = RequestOptions::default();
        self.write(Method::PUT, &path, params, &options, "update custom page")
            .await
    }

    async fn delete_custom_page(&self, slug: &str) -> Result<bool, ApiError> {
        let path = ["custompages", slug];
        self.delete(&path, &RequestOptions::default(), "delete custom page")
            .await
    }

    async fn get_project(&self) -> Result<Project, ApiError> {
        let response = self
            .send(
                self.request(Method::GET, &[], &RequestOptions::default()),
                "get project",
            )
            .await?;
        Self::decode(response, "get project").await
    }

    async fn list_api_specifications(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<ApiSpecification>, ApiError> {
        self.list(&["api-specification"], options, "list API specifications")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readme(base_url: &str) -> HttpReadme {
        HttpReadme::new(base_url, SecretString::new("token".to_string())).unwrap()
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client = readme("https://dash.readme.com/api/v1");
        assert_eq!(
            client.url(&["docs", "getting-started"]).as_str(),
            "https://dash.readme.com/api/v1/docs/getting-started"
        );
        assert_eq!(
            client.url(&["version", "v1.0"]).as_str(),
            "https://dash.readme.com/api/v1/version/v1.0"
        );
        assert_eq!(
            client.url(&["docs", "a b/c"]).as_str(),
            "https://dash.readme.com/api/v1/docs/a%20b%2Fc"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = readme("https://dash.readme.com/api/v1/");
        assert_eq!(client.base_url(), "https://dash.readme.com/api/v1");
        assert_eq!(
            client.url(&["categories"]).as_str(),
            "https://dash.readme.com/api/v1/categories"
        );
        assert!(!format!("{:?}", client).contains("token"));

        let root = readme("http://localhost:3000");
        assert_eq!(root.url(&["docs", "x"]).as_str(), "http://localhost:3000/docs/x");
    }

    #[test]
    fn test_invalid_base_url() {
        let token = || SecretString::new("token".to_string());
        assert!(HttpReadme::new("dash.readme.com", token()).is_err());
        assert!(HttpReadme::new("mailto:docs@example.com", token()).is_err());
    }
}
