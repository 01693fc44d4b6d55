//! End-to-end engine scenarios over the in-memory store, including races
//! between concurrent donations and claims.

use assert_matches::assert_matches;
use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::donation::{generate_receipt_number, PaymentMethod, PaymentStatus};
use fundbridge_core::error::CoreError;
use fundbridge_core::roles::{Actor, Role};
use fundbridge_core::task::{ReviewDecision, TaskStatus, TaskType};
use fundbridge_core::types::{Cents, DbId};
use fundbridge_db::models::campaign::{CreateCampaign, UpdateCampaign};
use fundbridge_db::models::task::CreateTask;
use fundbridge_engine::donations::RecordDonation;
use fundbridge_engine::memory::MemoryStore;
use fundbridge_engine::tasks::ProgressUpdate;
use fundbridge_engine::FundingEngine;
use futures::future::join_all;

fn admin() -> Actor {
    Actor::new(1, Role::Admin)
}

fn system() -> Actor {
    Actor::new(2, Role::System)
}

async fn live_campaign(engine: &FundingEngine<MemoryStore>, goal_cents: Cents) -> DbId {
    let creator = Actor::new(10, Role::Donee);
    let campaign = engine
        .campaigns
        .create_campaign(
            &creator,
            CreateCampaign {
                title: "Community kitchen".into(),
                description: None,
                goal_cents,
                beneficiary_id: None,
            },
        )
        .await
        .unwrap();
    for status in [CampaignStatus::Pending, CampaignStatus::Approved, CampaignStatus::Live] {
        engine
            .campaigns
            .edit_campaign(
                campaign.id,
                UpdateCampaign {
                    status: Some(status),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();
    }
    campaign.id
}

fn completed_gift(campaign_id: DbId, donor_id: DbId, amount_cents: Cents, ext: String) -> RecordDonation {
    RecordDonation {
        campaign_id,
        donor_id: Some(donor_id),
        anonymous_donor: None,
        amount_cents,
        transaction_fee_cents: None,
        payment_method: PaymentMethod::Card,
        external_payment_id: ext,
        payment_status: PaymentStatus::Completed,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_donations_sum_exactly() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 10_000_000).await;

    let amounts: Vec<Cents> = (1..=50).map(|i| i * 137).collect();
    let expected: Cents = amounts.iter().sum();

    let futures = amounts.iter().enumerate().map(|(i, &amount)| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .donations
                .record_donation(
                    &system(),
                    completed_gift(campaign_id, 1_000 + i as DbId, amount, format!("pi_race_{i}")),
                )
                .await
        })
    });
    for result in join_all(futures).await {
        assert!(result.unwrap().is_ok());
    }

    let campaign = engine.campaigns.get_campaign(campaign_id).await.unwrap();
    assert_eq!(campaign.raised_cents, expected);
    assert_eq!(campaign.stats.donation_count, 50);
    assert_eq!(campaign.stats.unique_donors, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_deliveries_credit_once() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 1_000_000).await;

    let futures = (0..8).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .donations
                .record_donation(
                    &system(),
                    completed_gift(campaign_id, 77, 4_200, "pi_dup".into()),
                )
                .await
        })
    });
    let results: Vec<_> = join_all(futures)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| !r.replayed).count(), 1);
    let ids: Vec<_> = results.iter().map(|r| r.donation.id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let campaign = engine.campaigns.get_campaign(campaign_id).await.unwrap();
    assert_eq!(campaign.raised_cents, 4_200);
    assert_eq!(campaign.stats.donation_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_one_winner() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 1_000).await;
    let task = engine
        .tasks
        .create_task(
            &admin(),
            CreateTask {
                campaign_id,
                task_type: TaskType::FieldVisit,
                title: "Visit the kitchen".into(),
                description: None,
                priority: None,
                deadline: None,
            },
        )
        .await
        .unwrap();

    let volunteers: Vec<DbId> = (200..216).collect();
    let futures = volunteers.iter().map(|&volunteer| {
        let engine = engine.clone();
        let task_id = task.id;
        tokio::spawn(async move { (volunteer, engine.tasks.claim_task(task_id, volunteer).await) })
    });
    let outcomes: Vec<_> = join_all(futures).await.into_iter().map(|r| r.unwrap()).collect();

    let winners: Vec<DbId> = outcomes
        .iter()
        .filter_map(|(v, r)| r.as_ref().ok().map(|_| *v))
        .collect();
    assert_eq!(winners.len(), 1);
    for (_, result) in outcomes.iter().filter(|(v, _)| *v != winners[0]) {
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    let stored = engine.tasks.get_task(task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Assigned);
    assert_eq!(stored.assigned_to, Some(winners[0]));
}

#[tokio::test]
async fn goal_reached_across_two_donations() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 50_000).await;

    engine
        .donations
        .record_donation(&system(), completed_gift(campaign_id, 31, 30_000, "pi_a".into()))
        .await
        .unwrap();
    let campaign = engine.campaigns.get_campaign(campaign_id).await.unwrap();
    assert_eq!(campaign.raised_cents, 30_000);
    assert_eq!(campaign.status, CampaignStatus::Live);
    assert_eq!(campaign.completed_at, None);

    engine
        .donations
        .record_donation(&system(), completed_gift(campaign_id, 32, 25_000, "pi_b".into()))
        .await
        .unwrap();
    let campaign = engine.campaigns.get_campaign(campaign_id).await.unwrap();
    assert_eq!(campaign.raised_cents, 55_000);
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert!(campaign.completed_at.is_some());

    // Completed campaigns take no new donations and stay completed.
    assert_matches!(
        engine
            .donations
            .record_donation(&system(), completed_gift(campaign_id, 33, 100, "pi_c".into()))
            .await,
        Err(CoreError::Validation(_))
    );
    assert_eq!(
        engine.campaigns.get_campaign(campaign_id).await.unwrap().status,
        CampaignStatus::Completed
    );
}

#[tokio::test]
async fn task_happy_path() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 1_000).await;
    let volunteer = 300;

    let task = engine
        .tasks
        .create_task(
            &admin(),
            CreateTask {
                campaign_id,
                task_type: TaskType::Verification,
                title: "Verify beneficiary".into(),
                description: Some("Check identity documents".into()),
                priority: Some(3),
                deadline: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let task = engine.tasks.claim_task(task.id, volunteer).await.unwrap();
    assert_eq!(task.status, TaskStatus::Assigned);
    assert_eq!(task.assigned_to, Some(volunteer));

    let task = engine
        .tasks
        .update_task_progress(
            task.id,
            volunteer,
            ProgressUpdate {
                progress: 100,
                status: None,
                note: Some("Documents verified".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Review);

    let task = engine
        .tasks
        .review_task(task.id, &admin(), ReviewDecision::Approved, Some("Thanks".into()))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());
    assert_eq!(task.reviewed_by, Some(1));
}

#[test]
fn receipt_numbers_are_unique_at_volume() {
    let today = chrono::Utc::now().date_naive();
    let receipts: std::collections::HashSet<String> =
        (0..10_000).map(|_| generate_receipt_number(today)).collect();
    assert!(receipts.len() > 9_990);
}

#[tokio::test]
async fn ten_thousand_recorded_receipts_are_distinct() {
    let engine = FundingEngine::new(MemoryStore::new());
    let campaign_id = live_campaign(&engine, 1_000_000_000).await;

    let mut receipts = std::collections::HashSet::new();
    for i in 0..10_000 {
        let recorded = engine
            .donations
            .record_donation(
                &system(),
                RecordDonation {
                    payment_status: PaymentStatus::Pending,
                    ..completed_gift(campaign_id, 9, 100, format!("pi_bulk_{i}"))
                },
            )
            .await
            .unwrap();
        receipts.insert(recorded.donation.receipt_number);
    }
    assert_eq!(receipts.len(), 10_000);
}
