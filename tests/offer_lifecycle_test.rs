//! End-to-end tests for the offer lifecycle: Draft -> Sent -> Won and the
//! dependent-document cascade a win triggers.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{seed_fixture, Fixture, TestContext};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use dossier_api::entities::affaire;
use dossier_api::entities::offer::{self, OfferStatus};
use dossier_api::entities::proforma;
use dossier_api::services::offers::{CreateOffer, OfferLine};
use dossier_api::ServiceError;

async fn draft_offer(ctx: &TestContext, fixture: &Fixture) -> offer::Model {
    ctx.services
        .offers
        .create(
            CreateOffer {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: Some(fixture.contact.id),
                principal_product_id: fixture.standard_product.id,
                lines: vec![OfferLine {
                    product_id: fixture.standard_product.id,
                    unit_price: dec!(1200),
                }],
                amount: dec!(1200),
                notes: None,
            },
            Some("commercial"),
        )
        .await
        .expect("failed to create offer")
}

#[tokio::test]
async fn winning_a_sent_offer_materializes_proforma_and_affaire_once() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    ctx.services
        .offers
        .send(offer.id, Some("commercial"))
        .await
        .unwrap();
    let won = ctx
        .services
        .offers
        .win(offer.id, Some("commercial"))
        .await
        .unwrap();

    assert_eq!(won.offer.status, OfferStatus::Won);
    assert!(won.offer.validated_at.is_some());
    assert!(won.offer.relance.is_none());

    let cascade = won.cascade.expect("win must fire the cascade");
    assert!(cascade.warnings.is_empty());

    let proformas = proforma::Entity::find()
        .filter(proforma::Column::OfferId.eq(offer.id))
        .all(&*ctx.db)
        .await
        .unwrap();
    let affaires = affaire::Entity::find()
        .filter(affaire::Column::OfferId.eq(offer.id))
        .all(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(proformas.len(), 1);
    assert_eq!(affaires.len(), 1);

    // The affaire reference embeds the offer's sequence and is slash-free
    // so children can embed it in turn.
    assert!(affaires[0].reference.starts_with("AFF"));
    assert!(!affaires[0].reference.contains('/'));
}

#[tokio::test]
async fn refiring_the_cascade_is_a_no_op() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    ctx.services.offers.send(offer.id, None).await.unwrap();
    let won = ctx.services.offers.win(offer.id, None).await.unwrap();

    let again = ctx
        .services
        .cascade
        .on_offer_won(&won.offer, None)
        .await
        .unwrap();
    assert!(again.created.is_empty());
    assert!(again.warnings.is_empty());

    let proformas = proforma::Entity::find()
        .filter(proforma::Column::OfferId.eq(offer.id))
        .all(&*ctx.db)
        .await
        .unwrap();
    let affaires = affaire::Entity::find()
        .filter(affaire::Column::OfferId.eq(offer.id))
        .all(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(proformas.len(), 1);
    assert_eq!(affaires.len(), 1);
}

#[tokio::test]
async fn winning_from_draft_is_rejected_and_leaves_the_offer_unchanged() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    let err = ctx
        .services
        .offers
        .win(offer.id, Some("impatient"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { ref from, ref to, .. } => {
        assert_eq!(from, "DRAFT");
        assert_eq!(to, "WON");
    });

    let unchanged = ctx.services.offers.get(offer.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, OfferStatus::Draft);
    assert_eq!(unchanged.version, offer.version);
    assert!(unchanged.validated_at.is_none());

    let affaires = affaire::Entity::find()
        .filter(affaire::Column::OfferId.eq(offer.id))
        .all(&*ctx.db)
        .await
        .unwrap();
    assert!(affaires.is_empty());
}

#[tokio::test]
async fn forced_win_bypasses_the_edge_check_and_is_audited() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    let won = ctx
        .services
        .offers
        .transition_with_options(
            offer.id,
            OfferStatus::Won,
            Some("admin"),
            Some("signed outside the usual flow"),
            true,
            None,
        )
        .await
        .unwrap();
    assert_eq!(won.offer.status, OfferStatus::Won);
    assert!(won.offer.validated_at.is_some());

    let history = ctx
        .services
        .audit
        .history(
            dossier_api::entities::audit_log::EntityKind::Offer,
            offer.id,
        )
        .await
        .unwrap();
    let forced = history
        .iter()
        .filter_map(|row| row.changes.as_ref())
        .any(|changes| changes["forced"] == serde_json::json!(true));
    assert!(forced, "the override must be visible in the audit trail");
}

#[tokio::test]
async fn terminal_offers_accept_no_further_transition() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    ctx.services
        .offers
        .lose(offer.id, None, Some("budget cut"))
        .await
        .unwrap();

    let err = ctx
        .services
        .offers
        .send(offer.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });
}

#[tokio::test]
async fn sending_schedules_the_first_follow_up() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;
    assert!(offer.relance.is_none());

    let before = Utc::now();
    let sent = ctx.services.offers.send(offer.id, None).await.unwrap();
    let relance = sent.offer.relance.expect("SENT must schedule a follow-up");

    let days = (relance - before).num_days();
    assert_eq!(days, 7);
}

#[tokio::test]
async fn winning_requires_a_validation_date_downstream() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;
    let offer = draft_offer(&ctx, &fixture).await;

    ctx.services.offers.send(offer.id, None).await.unwrap();
    let mut won = ctx.services.offers.win(offer.id, None).await.unwrap().offer;

    // Simulate a historical row that reached WON without its stamp.
    won.validated_at = None;
    let err = ctx
        .services
        .cascade
        .on_offer_won(&won, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::MissingPrerequisite(_));
}
