//! Donation, refund and payment-confirmation endpoints.

mod common;

use axum::http::StatusCode;
use common::*;
use fundbridge_engine::memory::MemoryStore;
use serde_json::{json, Value};

fn donation_body(campaign_id: i64, amount: f64, external_id: &str, status: &str) -> Value {
    json!({
        "campaign_id": campaign_id,
        "donor_id": DONOR,
        "amount": amount,
        "payment_method": "card",
        "external_payment_id": external_id,
        "payment_status": status,
    })
}

async fn campaign_json(store: &MemoryStore, id: i64) -> Value {
    let response = get(
        build_test_app(store.clone()),
        &format!("/api/v1/campaigns/{id}"),
        Some(&admin()),
    )
    .await;
    body_json(response).await["data"].clone()
}

#[tokio::test]
async fn completed_donation_is_credited_and_receipted() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;

    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        donation_body(campaign, 25.0, "pi_001", "completed"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["replayed"], false);
    let receipt = json["data"]["donation"]["receipt_number"].as_str().unwrap();
    assert!(receipt.starts_with("RCP-"));

    let campaign = campaign_json(&store, campaign).await;
    assert_eq!(campaign["raised_cents"], 2_500);
    assert_eq!(campaign["stats"]["donation_count"], 1);
    assert_eq!(campaign["stats"]["unique_donors"], 1);
}

#[tokio::test]
async fn replayed_payment_id_returns_200_and_credits_once() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;
    let body = donation_body(campaign, 25.0, "pi_dup", "completed");

    let first = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        body.clone(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_id = body_json(first).await["data"]["donation"]["id"].clone();

    let second = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        body,
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["data"]["replayed"], true);
    assert_eq!(json["data"]["donation"]["id"], first_id);

    assert_eq!(campaign_json(&store, campaign).await["raised_cents"], 2_500);
}

#[tokio::test]
async fn donor_cannot_record_for_someone_else() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;

    let response = post_json(
        build_test_app(store),
        "/api/v1/donations",
        &token(DONOR + 1, "donor"),
        donation_body(campaign, 25.0, "pi_other", "completed"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn draft_campaign_rejects_donations() {
    let store = MemoryStore::new();
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/campaigns",
        &token(CREATOR, "donee"),
        json!({ "title": "Not yet", "goal_amount": 10.0 }),
    )
    .await;
    let campaign = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json(
        build_test_app(store),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        donation_body(campaign, 5.0, "pi_draft", "completed"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_donation_is_credited_on_confirmation() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;

    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        donation_body(campaign, 40.0, "pi_pending", "pending"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(campaign_json(&store, campaign).await["raised_cents"], 0);

    // Only the payment processor may confirm.
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/payments/confirmations",
        &token(DONOR, "donor"),
        json!({ "external_payment_id": "pi_pending", "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/payments/confirmations",
        &system(),
        json!({ "external_payment_id": "pi_pending", "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["payment_status"], "completed");
    assert_eq!(campaign_json(&store, campaign).await["raised_cents"], 4_000);

    // A duplicate confirmation changes nothing.
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/payments/confirmations",
        &system(),
        json!({ "external_payment_id": "pi_pending", "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(campaign_json(&store, campaign).await["raised_cents"], 4_000);
}

#[tokio::test]
async fn donation_visible_to_donor_and_admin_only() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        donation_body(campaign, 10.0, "pi_visible", "completed"),
    )
    .await;
    let id = body_json(response).await["data"]["donation"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/donations/{id}");

    let own = get(build_test_app(store.clone()), &uri, Some(&token(DONOR, "donor"))).await;
    assert_eq!(own.status(), StatusCode::OK);

    let by_admin = get(build_test_app(store.clone()), &uri, Some(&admin())).await;
    assert_eq!(by_admin.status(), StatusCode::OK);

    let stranger = get(build_test_app(store), &uri, Some(&token(DONOR + 1, "donor"))).await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refund_reverses_campaign_totals() {
    let store = MemoryStore::new();
    let campaign = live_campaign(&store, 500.0).await;
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/donations",
        &token(DONOR, "donor"),
        donation_body(campaign, 60.0, "pi_refund", "completed"),
    )
    .await;
    let id = body_json(response).await["data"]["donation"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/donations/{id}/refund");

    let response = post_json(
        build_test_app(store.clone()),
        &uri,
        &token(DONOR, "donor"),
        json!({ "amount": 60.0, "reason": "Charged twice" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        build_test_app(store.clone()),
        &uri,
        &admin(),
        json!({ "amount": 60.0, "reason": "Charged twice" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["donation"]["payment_status"], "refunded");
    assert_eq!(json["data"]["donation"]["refund_amount_cents"], 6_000);

    assert_eq!(campaign_json(&store, campaign).await["raised_cents"], 0);

    // A refunded donation cannot be refunded again.
    let response = post_json(
        build_test_app(store),
        &uri,
        &admin(),
        json!({ "amount": 60.0, "reason": "Charged twice" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
