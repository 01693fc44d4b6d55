//! Verification task endpoints.

mod common;

use axum::http::StatusCode;
use common::*;
use fundbridge_engine::memory::MemoryStore;
use serde_json::json;

async fn create_task(store: &MemoryStore, campaign: i64) -> i64 {
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/tasks",
        &admin(),
        json!({
            "campaign_id": campaign,
            "task_type": "field_visit",
            "title": "Visit the well site",
            "description": "Photograph the pump",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn only_admin_or_campaign_creator_creates_tasks() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;
    let body = json!({
        "campaign_id": campaign,
        "task_type": "verification",
        "title": "Check documents",
    });

    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/tasks",
        &token(VOLUNTEER, "volunteer"),
        body.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        build_test_app(store),
        "/api/v1/tasks",
        &token(CREATOR, "donee"),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert!(json["data"]["assigned_to"].is_null());
}

#[tokio::test]
async fn past_deadline_is_rejected() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;

    let response = post_json(
        build_test_app(store),
        "/api/v1/tasks",
        &admin(),
        json!({
            "campaign_id": campaign,
            "task_type": "verification",
            "title": "Too late",
            "deadline": "2020-01-01T00:00:00Z",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn claim_requires_volunteer_role() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;
    let task = create_task(&store, campaign).await;

    let response = post_empty(
        build_test_app(store),
        &format!("/api/v1/tasks/{task}/claim"),
        &token(DONOR, "donor"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn second_volunteer_claim_conflicts() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;
    let task = create_task(&store, campaign).await;
    let uri = format!("/api/v1/tasks/{task}/claim");

    let response = post_empty(build_test_app(store.clone()), &uri, &token(VOLUNTEER, "volunteer")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "assigned");
    assert_eq!(json["data"]["assigned_to"], VOLUNTEER);

    // Re-claiming by the assignee is a no-op.
    let response = post_empty(build_test_app(store.clone()), &uri, &token(VOLUNTEER, "volunteer")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_empty(
        build_test_app(store),
        &uri,
        &token(OTHER_VOLUNTEER, "volunteer"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_lifecycle_through_review() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;
    let task = create_task(&store, campaign).await;
    let volunteer = token(VOLUNTEER, "volunteer");

    post_empty(
        build_test_app(store.clone()),
        &format!("/api/v1/tasks/{task}/claim"),
        &volunteer,
    )
    .await;

    let progress_uri = format!("/api/v1/tasks/{task}/progress");
    let response = post_json(
        build_test_app(store.clone()),
        &progress_uri,
        &volunteer,
        json!({ "progress": 40, "note": "Arrived on site" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "in_progress");

    // Someone else's task.
    let response = post_json(
        build_test_app(store.clone()),
        &progress_uri,
        &token(OTHER_VOLUNTEER, "volunteer"),
        json!({ "progress": 50 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        build_test_app(store.clone()),
        &progress_uri,
        &volunteer,
        json!({ "progress": 150 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        build_test_app(store.clone()),
        &progress_uri,
        &volunteer,
        json!({ "progress": 100, "note": "Pump works" }),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["status"], "review");

    let review_uri = format!("/api/v1/tasks/{task}/review");
    let response = post_json(
        build_test_app(store.clone()),
        &review_uri,
        &volunteer,
        json!({ "decision": "approved" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        build_test_app(store.clone()),
        &review_uri,
        &admin(),
        json!({ "decision": "approved", "feedback": "Thanks" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["review_decision"], "approved");

    // Completed tasks cannot be reviewed again.
    let response = post_json(
        build_test_app(store.clone()),
        &review_uri,
        &admin(),
        json!({ "decision": "rejected" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = get(
        build_test_app(store),
        &format!("/api/v1/tasks/{task}/updates"),
        Some(&volunteer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_cancels_task() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 100.0).await;
    let task = create_task(&store, campaign).await;

    let response = post_json(
        build_test_app(store.clone()),
        &format!("/api/v1/tasks/{task}/cancel"),
        &admin(),
        json!({ "reason": "Duplicate task" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "cancelled");

    let response = post_empty(
        build_test_app(store),
        &format!("/api/v1/tasks/{task}/claim"),
        &token(VOLUNTEER, "volunteer"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
