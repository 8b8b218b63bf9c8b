#![allow(dead_code)]

use std::sync::Arc;

use hemmer_provider_readme::client::{CategoryParams, InMemoryReadme, ReadmeApi, RequestOptions};
use hemmer_provider_readme::testing::ProviderTester;
use hemmer_provider_readme::ReadmeProvider;
use serde_json::{json, Value};

/// A configured provider backed by a fresh in-memory project, plus a handle
/// on that project.
pub async fn setup() -> (InMemoryReadme, ProviderTester<ReadmeProvider>) {
    setup_with(json!({"api_token": "test-token"})).await
}

pub async fn setup_with(config: Value) -> (InMemoryReadme, ProviderTester<ReadmeProvider>) {
    let api = InMemoryReadme::new();
    let provider = ReadmeProvider::new()
        .with_client(Arc::new(api.clone()))
        .with_env(Vec::<(String, String)>::new());
    let tester = ProviderTester::new(provider);
    tester
        .configure(config)
        .await
        .expect("provider should configure");
    (api, tester)
}

/// Seed a `guides` category in the stable version.
pub async fn seed_guides(api: &InMemoryReadme) {
    api.create_category(
        &CategoryParams {
            title: "Guides".to_string(),
            category_type: None,
        },
        &RequestOptions::default(),
    )
    .await
    .expect("category should be created");
}
