//! Campaign endpoints.

mod common;

use axum::http::StatusCode;
use common::*;
use fundbridge_engine::memory::MemoryStore;
use serde_json::json;

#[tokio::test]
async fn create_campaign_converts_goal_to_cents() {
    let store = MemoryStore::new();
    let response = post_json(
        build_test_app(store),
        "/api/v1/campaigns",
        &token(CREATOR, "donee"),
        json!({ "title": "School roof", "description": "Replace the roof", "goal_amount": 1250.5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["goal_cents"], 125_050);
    assert_eq!(json["data"]["raised_cents"], 0);
    assert_eq!(json["data"]["status"], "draft");
    assert_eq!(json["data"]["creator_id"], CREATOR);
}

#[tokio::test]
async fn create_campaign_rejects_sub_cent_amount() {
    let response = post_json(
        build_test_app(MemoryStore::new()),
        "/api/v1/campaigns",
        &token(CREATOR, "donee"),
        json!({ "title": "School roof", "goal_amount": 10.005 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn get_missing_campaign_is_404() {
    let response = get(
        build_test_app(MemoryStore::new()),
        "/api/v1/campaigns/999",
        Some(&token(DONOR, "donor")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_requires_admin() {
    let store = MemoryStore::new();
    let id = live_campaign(&store, 100.0).await;

    let response = patch_json(
        build_test_app(store),
        &format!("/api/v1/campaigns/{id}"),
        &token(CREATOR, "donee"),
        json!({ "title": "Renamed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn edit_rejects_ledger_fields() {
    let store = MemoryStore::new();
    let id = live_campaign(&store, 100.0).await;

    let response = patch_json(
        build_test_app(store),
        &format!("/api/v1/campaigns/{id}"),
        &admin(),
        json!({ "raised_cents": 1_000_000 }),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn illegal_status_change_is_rejected() {
    let store = MemoryStore::new();
    let id = live_campaign(&store, 100.0).await;

    let response = patch_json(
        build_test_app(store),
        &format!("/api/v1/campaigns/{id}"),
        &admin(),
        json!({ "status": "draft" }),
    )
    .await;
    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_edit_is_audited() {
    let store = MemoryStore::new();
    let id = live_campaign(&store, 100.0).await;

    let response = patch_json(
        build_test_app(store.clone()),
        &format!("/api/v1/campaigns/{id}"),
        &admin(),
        json!({ "title": "Clean water for 200 homes" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["title"],
        "Clean water for 200 homes"
    );

    let response = get(
        build_test_app(store),
        &format!("/api/v1/admin/audit-logs?entity_kind=campaign&entity_id={id}&action=campaign_updated"),
        Some(&admin()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // Three moderation steps plus the title edit.
    assert_eq!(json["data"]["total"], 4);
}

#[tokio::test]
async fn delete_campaign_then_get_is_404() {
    let store = MemoryStore::new();
    let id = live_campaign(&store, 100.0).await;
    let uri = format!("/api/v1/campaigns/{id}");

    let response = delete(build_test_app(store.clone()), &uri, &admin()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(build_test_app(store.clone()), &uri, Some(&admin())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(build_test_app(store), &uri, &admin()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
