//! Resource lifecycle behaviour through the provider.

mod common;

use std::sync::Arc;

use common::{seed_guides, setup, setup_with};
use hemmer_provider_readme::client::{ApiError, InMemoryReadme};
use hemmer_provider_readme::provider::API_TOKEN_ENV;
use hemmer_provider_readme::testing::{
    assert_error_contains, assert_error_on, assert_has_errors, assert_plan_replaces, ProviderTester,
    TestError,
};
use hemmer_provider_readme::{ProviderError, ReadmeProvider};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn delete_is_idempotent() {
    let (api, tester) = setup().await;
    let state = assert_ok!(
        tester
            .lifecycle_create("readme_changelog", json!({"title": "Release 1", "type": "added"}))
            .await
    );
    assert_eq!(state["hidden"], true);

    assert_ok!(tester.lifecycle_delete("readme_changelog", state.clone()).await);
    assert!(api.remove_changelog("release-1").is_none());

    assert_ok!(tester.delete("readme_changelog", state.clone()).await);
    let result = assert_ok!(tester.read("readme_changelog", state).await);
    assert!(result.state.is_none());
}

#[tokio::test]
async fn follow_up_read_failure_is_reported_separately() {
    let (api, tester) = setup().await;
    let plan = assert_ok!(
        tester
            .plan_create("readme_category", json!({"title": "Guides"}))
            .await
    );

    api.fail_next("get_category", ApiError::new(500, "upstream timeout"));
    let err = assert_err!(tester.create("readme_category", plan.planned_state).await);

    assert!(matches!(err, ProviderError::FollowUpRead { .. }), "{:?}", err);
    assert_eq!(err.summary(), "Follow-up read failed");
    assert!(err
        .detail()
        .starts_with("create category succeeded but the follow-up read failed"));
    assert!(api.calls().contains(&"create_category"));
}

#[tokio::test]
async fn mutation_failure_is_an_api_error() {
    let (api, tester) = setup().await;
    let plan = assert_ok!(
        tester
            .plan_create("readme_category", json!({"title": "Guides"}))
            .await
    );

    api.fail_next("create_category", ApiError::new(400, "title is too long"));
    let err = assert_err!(tester.create("readme_category", plan.planned_state).await);

    assert!(matches!(err, ProviderError::Api(_)), "{:?}", err);
    assert!(err.detail().contains("title is too long"));
    assert!(!api.calls().contains(&"get_category"));
}

#[tokio::test]
async fn conflicting_version_flags_are_rejected_before_any_call() {
    let (api, tester) = setup().await;
    let config = json!({"version": "2.0", "from": "1.0", "is_stable": true, "is_hidden": true});

    let err = assert_err!(
        tester
            .validate_resource_config("readme_version", config.clone())
            .await
    );
    assert!(matches!(err, TestError::Diagnostics(_)));

    let plan = assert_ok!(tester.plan_create("readme_version", config).await);
    assert_has_errors(&plan.diagnostics);
    assert_error_contains(&plan.diagnostics, "Conflicting attributes");
    assert!(api.calls().is_empty(), "{:?}", api.calls());
}

#[tokio::test]
async fn changing_the_fork_source_replaces_the_version() {
    let (_api, tester) = setup().await;
    let state = assert_ok!(
        tester
            .lifecycle_create("readme_version", json!({"version": "2.0", "from": "1.0"}))
            .await
    );
    assert_eq!(state["version_clean"], "2.0");

    let plan = assert_ok!(
        tester
            .plan_update(
                "readme_version",
                state,
                json!({"version": "2.0", "from": "1.1"}),
            )
            .await
    );
    assert_plan_replaces(&plan);
}

#[tokio::test]
async fn malformed_front_matter_is_scoped_to_body() {
    let (api, tester) = setup().await;
    let plan = assert_ok!(
        tester
            .plan_create(
                "readme_doc",
                json!({"category_slug": "guides", "body": "---\ntitle: X\nbody text"}),
            )
            .await
    );

    assert_error_on(&plan.diagnostics, "body");
    assert_error_contains(&plan.diagnostics, "Invalid front matter");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn missing_token_aborts_configuration() {
    let provider = ReadmeProvider::new()
        .with_client(Arc::new(InMemoryReadme::new()))
        .with_env(Vec::<(String, String)>::new());
    let tester = ProviderTester::new(provider);

    let err = assert_err!(tester.configure(json!({"api_token": ""})).await);
    match err {
        TestError::Diagnostics(diagnostics) => assert_error_on(&diagnostics, "api_token"),
        other => panic!("expected diagnostics, got {}", other),
    }

    let err = assert_err!(tester.read_data_source("readme_project", json!({})).await);
    assert!(matches!(err, ProviderError::Configuration(_)));
}

#[tokio::test]
async fn token_falls_back_to_environment() {
    let provider = ReadmeProvider::new()
        .with_client(Arc::new(InMemoryReadme::new()))
        .with_env([(API_TOKEN_ENV, "from-env")]);
    let tester = ProviderTester::new(provider);

    assert_ok!(tester.configure(json!({})).await);
    let project = assert_ok!(tester.read_data_source("readme_project", json!({})).await);
    assert_eq!(project["subdomain"], "test-project");
}

#[tokio::test]
async fn destroy_child_docs_from_provider_config() {
    let (api, tester) = setup_with(json!({
        "api_token": "test-token",
        "config": {"destroy_child_docs": true},
    }))
    .await;
    seed_guides(&api).await;

    let parent = assert_ok!(
        tester
            .lifecycle_create("readme_doc", json!({"title": "Parent", "category_slug": "guides"}))
            .await
    );
    let child = assert_ok!(
        tester
            .lifecycle_create(
                "readme_doc",
                json!({"title": "Child", "category_slug": "guides", "parent_doc_slug": "parent"}),
            )
            .await
    );
    assert_eq!(child["parent_doc"], parent["id"]);
    assert_eq!(api.doc_count("1.0"), 2);

    assert_ok!(tester.lifecycle_delete("readme_doc", parent).await);
    assert_eq!(api.doc_count("1.0"), 0);
}

#[tokio::test]
async fn import_reads_and_fills_defaults() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    assert_ok!(
        tester
            .lifecycle_create(
                "readme_doc",
                json!({"title": "Quickstart", "category_slug": "guides", "body": "Hello"}),
            )
            .await
    );

    let imported = assert_ok!(tester.import_resource("readme_doc", "1.0:quickstart").await);
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "readme_doc");
    let state = &imported[0].state;
    assert_eq!(state["title"], "Quickstart");
    assert_eq!(state["category_slug"], "guides");
    assert_eq!(state["version"], "1.0");
    assert_eq!(state["hidden"], false);

    let err = assert_err!(tester.import_resource("readme_doc", "1.0:missing").await);
    assert!(matches!(err, ProviderError::NotFound(_)), "{:?}", err);
}
