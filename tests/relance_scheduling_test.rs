//! Follow-up scheduling rules and the due-now query surface.

mod common;

use chrono::{Duration, Utc};
use common::{seed_fixture, Fixture, TestContext};
use rust_decimal_macros::dec;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use dossier_api::entities::audit_log::EntityKind;
use dossier_api::entities::opportunity;
use dossier_api::services::opportunities::CreateOpportunity;
use dossier_api::services::relance::is_due;
use dossier_api::Event;

async fn prospect(ctx: &TestContext, fixture: &Fixture) -> opportunity::Model {
    ctx.services
        .opportunities
        .create(
            CreateOpportunity {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: fixture.contact.id,
                principal_product_id: fixture.standard_product.id,
                product_ids: vec![fixture.standard_product.id],
                estimated_amount: dec!(5000),
                description: Some("extension of the maintenance contract".into()),
                client_needs: None,
            },
            Some("commercial"),
        )
        .await
        .expect("failed to create opportunity")
}

#[tokio::test]
async fn a_new_prospect_gets_a_fourteen_day_follow_up() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let before = Utc::now();
    let opp = prospect(&ctx, &fixture).await;

    let relance = opp.relance.expect("PROSPECT must schedule a follow-up");
    assert_eq!((relance - before).num_days(), 14);
}

#[tokio::test]
async fn transitions_extend_from_the_existing_follow_up() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let opp = prospect(&ctx, &fixture).await;
    let initial = opp.relance.unwrap();

    let qualified = ctx
        .services
        .opportunities
        .qualify(opp.id, Some("commercial"))
        .await
        .unwrap();

    // Base date is the stored relance, not now: 14d + 10d from creation.
    let next = qualified.relance.unwrap();
    assert_eq!(next, initial + Duration::days(10));
    assert_eq!(qualified.probability, 30);
}

#[tokio::test]
async fn losing_clears_the_follow_up_and_stamps_closure() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let opp = prospect(&ctx, &fixture).await;

    let lost = ctx
        .services
        .opportunities
        .lose(opp.id, Some("commercial"), Some("went with a competitor"))
        .await
        .unwrap();

    assert!(lost.relance.is_none());
    assert!(lost.closed_at.is_some());
    assert_eq!(lost.probability, 0);
    assert!(!is_due(lost.relance, true, Utc::now()));

    let due = ctx.services.relance.list_due(Utc::now()).await.unwrap();
    assert!(due.iter().all(|item| item.id != opp.id));
}

#[tokio::test]
async fn due_items_are_listed_oldest_first_and_dispatched() {
    let mut ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let older = prospect(&ctx, &fixture).await;
    let newer = prospect(&ctx, &fixture).await;

    // Backdate both follow-ups so they are due now, the first further past.
    let now = Utc::now();
    for (opp, days) in [(&older, 5), (&newer, 2)] {
        opportunity::Entity::update_many()
            .set(opportunity::ActiveModel {
                relance: Set(Some(now - Duration::days(days))),
                ..Default::default()
            })
            .filter(opportunity::Column::Id.eq(opp.id))
            .exec(&*ctx.db)
            .await
            .unwrap();
    }

    let due = ctx.services.relance.list_due(now).await.unwrap();
    let ids: Vec<_> = due.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert!(due.iter().all(|item| item.kind == EntityKind::Opportunity));
    assert_eq!(due[0].client_name, fixture.client.name);

    let dispatched = ctx.services.relance.dispatch_due(now).await.unwrap();
    assert_eq!(dispatched, 2);

    // Drain creation events until the relance notifications surface.
    let mut relance_events = 0;
    while let Ok(event) = ctx.events.try_recv() {
        if let Event::RelanceRequise { entity_ref, .. } = event {
            assert!(entity_ref.contains("/OPP/"));
            relance_events += 1;
        }
    }
    assert_eq!(relance_events, 2);
}

#[tokio::test]
async fn future_follow_ups_are_not_due() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let opp = prospect(&ctx, &fixture).await;

    assert!(opp.relance.unwrap() > Utc::now());
    let due = ctx.services.relance.list_due(Utc::now()).await.unwrap();
    assert!(due.is_empty());
}
