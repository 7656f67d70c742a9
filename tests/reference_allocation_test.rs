//! Sequence allocation and reference uniqueness against a real store.

mod common;

use chrono::{TimeZone, Utc};
use common::{seed_fixture, TestContext};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use uuid::Uuid;

use dossier_api::entities::offer::{self, OfferStatus};
use dossier_api::services::offers::{CreateOffer, OfferLine};
use dossier_api::services::references;
use dossier_api::services::sequences::ScopeKey;

#[tokio::test]
async fn allocations_within_one_scope_are_dense_and_distinct() {
    let ctx = TestContext::new().await;
    let march = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let scope = ScopeKey::monthly("KIP", "OFF", march);

    let mut numbers = Vec::new();
    for _ in 0..10 {
        numbers.push(ctx.services.sequences.allocate(&scope).await.unwrap());
    }

    assert_eq!(numbers, (1..=10).collect::<Vec<i32>>());
}

#[tokio::test]
async fn concurrent_allocations_never_collide() {
    let ctx = TestContext::new().await;
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let scope = ScopeKey::monthly("KIP", "RAP", at);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let allocator = ctx.services.sequences.clone();
        let scope = scope.clone();
        handles.push(tokio::spawn(
            async move { allocator.allocate(&scope).await },
        ));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap());
    }

    let distinct: std::collections::HashSet<i32> = numbers.iter().copied().collect();
    assert_eq!(distinct.len(), numbers.len());
    assert_eq!(*numbers.iter().min().unwrap(), 1);
    assert_eq!(*numbers.iter().max().unwrap(), 16);
}

#[tokio::test]
async fn scopes_count_independently() {
    let ctx = TestContext::new().await;
    let march = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let april = Utc.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).unwrap();

    let a = ScopeKey::monthly("KIP", "OFF", march);
    let b = ScopeKey::monthly("KIP", "OFF", april);
    let c = ScopeKey::monthly("ALT", "OFF", march);

    assert_eq!(ctx.services.sequences.allocate(&a).await.unwrap(), 1);
    assert_eq!(ctx.services.sequences.allocate(&a).await.unwrap(), 2);
    // A different month or entity starts over at 1.
    assert_eq!(ctx.services.sequences.allocate(&b).await.unwrap(), 1);
    assert_eq!(ctx.services.sequences.allocate(&c).await.unwrap(), 1);
}

#[tokio::test]
async fn march_2025_offer_scope_yields_sequential_padded_references() {
    let ctx = TestContext::new().await;
    let client_id = Uuid::new_v4();
    let march = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();
    let scope = ScopeKey::monthly_client("KIP", "OFF", march, client_id);

    let first = ctx.services.sequences.allocate(&scope).await.unwrap();
    let second = ctx.services.sequences.allocate(&scope).await.unwrap();

    let r1 = references::offer_reference("KIP", "C001", march, "VTE1", 1, first);
    let r2 = references::offer_reference("KIP", "C001", march, "VTE1", 1, second);

    assert!(r1.starts_with("KIP/OFF/"));
    assert!(r1.contains("2503"));
    assert!(r1.ends_with("0001"));
    assert!(r2.ends_with("0002"));
}

#[tokio::test]
async fn consecutive_offers_share_the_scope_and_advance_the_sequence() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let input = CreateOffer {
        entity_id: fixture.entity.id,
        client_id: fixture.client.id,
        contact_id: Some(fixture.contact.id),
        principal_product_id: fixture.standard_product.id,
        lines: vec![OfferLine {
            product_id: fixture.standard_product.id,
            unit_price: dec!(1000),
        }],
        amount: dec!(1000),
        notes: None,
    };

    let first = ctx
        .services
        .offers
        .create(input.clone(), Some("tester"))
        .await
        .unwrap();
    let second = ctx.services.offers.create(input, Some("tester")).await.unwrap();

    assert_eq!(first.sequence_number, 1);
    assert_eq!(second.sequence_number, 2);
    assert!(first.reference.ends_with("0001"));
    assert!(second.reference.ends_with("0002"));
    assert_ne!(first.reference, second.reference);
}

#[tokio::test]
async fn duplicate_reference_is_rejected_by_the_store() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let offer = ctx
        .services
        .offers
        .create(
            CreateOffer {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: None,
                principal_product_id: fixture.standard_product.id,
                lines: vec![],
                amount: dec!(500),
                notes: None,
            },
            None,
        )
        .await
        .unwrap();

    // Same reference, fresh id: the unique index must refuse it.
    let clash = offer::ActiveModel {
        id: Set(Uuid::new_v4()),
        reference: Set(offer.reference.clone()),
        sequence_number: Set(99),
        entity_id: Set(offer.entity_id),
        client_id: Set(offer.client_id),
        contact_id: Set(None),
        principal_product_id: Set(offer.principal_product_id),
        amount: Set(dec!(500)),
        status: Set(OfferStatus::Draft),
        status_dates: Set(serde_json::json!({})),
        notes: Set(None),
        validated_at: Set(None),
        relance: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        created_by: Set(None),
        version: Set(1),
    }
    .insert(&*ctx.db)
    .await;

    assert!(clash.is_err());
}
