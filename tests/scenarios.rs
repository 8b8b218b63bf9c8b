//! End-to-end plan/apply scenarios against an in-memory ReadMe project.

mod common;

use common::{seed_guides, setup};
use hemmer_provider_readme::testing::{
    assert_no_errors, assert_plan_changes_attribute, assert_plan_does_not_change_attribute,
    assert_plan_no_changes, assert_plan_unknown, assert_planned,
};
use hemmer_provider_readme::UNKNOWN_VALUE;
use serde_json::json;
use tokio_test::assert_ok;

#[tokio::test]
async fn front_matter_supplies_unset_title() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    let config = json!({
        "category_slug": "guides",
        "body": "---\ntitle: X\n---\nbody text",
    });

    let plan = assert_ok!(tester.plan_create("readme_doc", config.clone()).await);
    assert_no_errors(&plan.diagnostics);
    assert_planned(&plan, "title", json!("X"));

    let state = assert_ok!(tester.lifecycle_create("readme_doc", config).await);
    assert_eq!(state["title"], "X");
    assert_eq!(state["slug"], "x");
}

#[tokio::test]
async fn configured_title_wins_over_front_matter() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    let config = json!({
        "title": "Y",
        "category_slug": "guides",
        "body": "---\ntitle: X\n---\nbody text",
    });

    let plan = assert_ok!(tester.plan_create("readme_doc", config.clone()).await);
    assert_planned(&plan, "title", json!("Y"));

    let state = assert_ok!(tester.lifecycle_create("readme_doc", config).await);
    assert_eq!(state["title"], "Y");
}

#[tokio::test]
async fn configured_change_invalidates_revision() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    let created = assert_ok!(
        tester
            .lifecycle_create(
                "readme_doc",
                json!({"title": "Doc", "category_slug": "guides", "hidden": false, "body": "text"}),
            )
            .await
    );
    assert_eq!(created["hidden"], false);
    assert_eq!(created["revision"], 1);

    let config = json!({"title": "Doc", "category_slug": "guides", "hidden": true, "body": "text"});
    let plan = assert_ok!(tester.plan_update("readme_doc", created.clone(), config.clone()).await);
    assert_plan_changes_attribute(&plan, "hidden");
    assert_plan_unknown(&plan, "revision");
    assert_plan_unknown(&plan, "updated_at");

    let updated = assert_ok!(tester.lifecycle_update("readme_doc", created, config.clone()).await);
    assert_eq!(updated["hidden"], true);
    assert_eq!(updated["revision"], 2);

    let replan = assert_ok!(tester.plan_update("readme_doc", updated, config).await);
    assert_plan_no_changes(&replan);
}

#[tokio::test]
async fn removing_configured_hidden_invalidates_revision() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    let body = "---\ntitle: Doc\ncategorySlug: guides\n---\ntext";
    let created = assert_ok!(
        tester
            .lifecycle_create("readme_doc", json!({"hidden": true, "body": body}))
            .await
    );
    assert_eq!(created["hidden"], true);
    assert_eq!(created["revision"], 1);

    // Without configuration or front matter, `hidden` reverts to false.
    let config = json!({"body": body});
    let plan = assert_ok!(tester.plan_update("readme_doc", created.clone(), config.clone()).await);
    assert_no_errors(&plan.diagnostics);
    assert_planned(&plan, "hidden", json!(false));
    assert_plan_unknown(&plan, "revision");
    assert_plan_unknown(&plan, "updated_at");
    assert_plan_does_not_change_attribute(&plan, "body");

    let updated = assert_ok!(tester.lifecycle_update("readme_doc", created, config.clone()).await);
    assert_eq!(updated["hidden"], false);
    assert_eq!(updated["revision"], 2);

    let replan = assert_ok!(tester.plan_update("readme_doc", updated, config).await);
    assert_plan_no_changes(&replan);
}

#[tokio::test]
async fn read_of_deleted_doc_drops_it_from_state() {
    let (api, tester) = setup().await;
    seed_guides(&api).await;
    let state = assert_ok!(
        tester
            .lifecycle_create("readme_doc", json!({"title": "Gone", "category_slug": "guides"}))
            .await
    );

    assert!(api.remove_doc("1.0", "gone").is_some());

    let result = assert_ok!(tester.read("readme_doc", state).await);
    assert!(result.state.is_none());
    assert!(result.diagnostics.is_empty());
}

#[tokio::test]
async fn create_returns_server_assigned_fields() {
    let (_api, tester) = setup().await;
    let plan = assert_ok!(
        tester
            .plan_create("readme_category", json!({"title": "API Reference"}))
            .await
    );
    assert_plan_unknown(&plan, "id");
    assert_plan_unknown(&plan, "slug");

    let result = assert_ok!(tester.create("readme_category", plan.planned_state).await);
    let state = result.state.expect("created category");

    assert!(!state["id"].as_str().unwrap_or_default().is_empty());
    assert_eq!(state["slug"], "api-reference");
    assert!(!state["created_at"].as_str().unwrap_or_default().is_empty());
    assert_eq!(state["version"], "1.0");
    assert!(!state.to_string().contains(UNKNOWN_VALUE));
}
