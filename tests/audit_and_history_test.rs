//! Audit trail, status history, and the documents that hang off a training
//! delivery: formations, participants, attestations, plus correspondence.

mod common;

use assert_matches::assert_matches;
use common::{seed_fixture, TestContext};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use dossier_api::entities::audit_log::{AuditAction, EntityKind};
use dossier_api::entities::formation;
use dossier_api::services::courriers::CreateCourrier;
use dossier_api::services::offers::{CreateOffer, OfferLine};
use dossier_api::services::opportunities::CreateOpportunity;
use dossier_api::ServiceError;

#[tokio::test]
async fn every_lifecycle_step_leaves_an_audit_row() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let offer = ctx
        .services
        .offers
        .create(
            CreateOffer {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: Some(fixture.contact.id),
                principal_product_id: fixture.standard_product.id,
                lines: vec![],
                amount: dec!(900),
                notes: None,
            },
            Some("alice"),
        )
        .await
        .unwrap();
    ctx.services.offers.send(offer.id, Some("alice")).await.unwrap();
    ctx.services.offers.win(offer.id, Some("bob")).await.unwrap();

    let history = ctx
        .services
        .audit
        .history(EntityKind::Offer, offer.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    // Newest first: the win comes back before the send and the creation.
    assert_eq!(history[0].action, AuditAction::Validate);
    assert_eq!(history[0].actor.as_deref(), Some("bob"));
    assert_eq!(history[2].action, AuditAction::Create);
    assert_eq!(history[2].actor.as_deref(), Some("alice"));

    let transitions = ctx
        .services
        .audit
        .status_history(EntityKind::Offer, offer.id)
        .await
        .unwrap();
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0].old_status, "SENT");
    assert_eq!(transitions[0].new_status, "WON");
    assert_eq!(transitions[1].old_status, "DRAFT");
    assert_eq!(transitions[1].new_status, "SENT");
}

#[tokio::test]
async fn system_actions_record_an_explicit_absent_actor() {
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
                amount: dec!(100),
                notes: None,
            },
            None,
        )
        .await
        .unwrap();

    let history = ctx
        .services
        .audit
        .history(EntityKind::Offer, offer.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].actor.is_none());
}

#[tokio::test]
async fn attestations_are_unique_per_formation_and_participant() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let offer = ctx
        .services
        .offers
        .create(
            CreateOffer {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: Some(fixture.contact.id),
                principal_product_id: fixture.training_product.id,
                lines: vec![OfferLine {
                    product_id: fixture.training_product.id,
                    unit_price: dec!(2500),
                }],
                amount: dec!(2500),
                notes: None,
            },
            Some("commercial"),
        )
        .await
        .unwrap();
    ctx.services.offers.send(offer.id, None).await.unwrap();
    ctx.services.offers.win(offer.id, None).await.unwrap();

    let affaire = ctx
        .services
        .affaires
        .get_by_offer(offer.id)
        .await
        .unwrap()
        .unwrap();
    ctx.services.affaires.validate(affaire.id, None).await.unwrap();

    let formation = formation::Entity::find()
        .filter(formation::Column::AffaireId.eq(affaire.id))
        .one(&*ctx.db)
        .await
        .unwrap()
        .expect("training product must yield a formation");

    let participant = ctx
        .seed_participant(formation.id, "Durand", "Claire")
        .await;

    let first = ctx
        .services
        .attestations
        .issue(
            formation.id,
            participant.id,
            "Sécurité incendie, 14h".to_string(),
            Some("formateur"),
        )
        .await
        .unwrap();
    assert!(first.reference.contains("/ATT/"));
    assert!(first.reference.contains(&affaire.reference));

    // Re-issuing returns the existing certificate instead of a duplicate.
    let second = ctx
        .services
        .attestations
        .issue(
            formation.id,
            participant.id,
            "Sécurité incendie, 14h".to_string(),
            Some("formateur"),
        )
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let all = ctx
        .services
        .attestations
        .for_formation(formation.id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn qualified_opportunities_materialize_offers() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let opp = ctx
        .services
        .opportunities
        .create(
            CreateOpportunity {
                entity_id: fixture.entity.id,
                client_id: fixture.client.id,
                contact_id: fixture.contact.id,
                principal_product_id: fixture.standard_product.id,
                product_ids: vec![fixture.standard_product.id, fixture.training_product.id],
                estimated_amount: dec!(7000),
                description: None,
                client_needs: Some("site audit then training".into()),
            },
            Some("commercial"),
        )
        .await
        .unwrap();

    // A bare prospect is too early to quote.
    let err = ctx
        .services
        .opportunities
        .create_offer(opp.id, Some("commercial"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::MissingPrerequisite(_));

    ctx.services
        .opportunities
        .qualify(opp.id, Some("commercial"))
        .await
        .unwrap();
    let offer = ctx
        .services
        .opportunities
        .create_offer(opp.id, Some("commercial"))
        .await
        .unwrap();

    assert_eq!(offer.client_id, fixture.client.id);
    assert_eq!(offer.amount, dec!(7000));
    let lines = ctx.services.offers.products(offer.id).await.unwrap();
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn courrier_references_are_dash_delimited_and_sequenced_per_day() {
    let ctx = TestContext::new().await;
    let fixture = seed_fixture(&ctx).await;

    let first = ctx
        .services
        .courriers
        .create(
            CreateCourrier {
                entity_id: fixture.entity.id,
                doc_type: "LTR".to_string(),
                client_id: fixture.client.id,
                notes: Some("convocation".into()),
            },
            Some("assistante"),
        )
        .await
        .unwrap();
    let second = ctx
        .services
        .courriers
        .create(
            CreateCourrier {
                entity_id: fixture.entity.id,
                doc_type: "LTR".to_string(),
                client_id: fixture.client.id,
                notes: None,
            },
            Some("assistante"),
        )
        .await
        .unwrap();

    assert!(first.reference.starts_with("KIP-LTR-"));
    assert!(first.reference.ends_with("-C001-001"));
    assert!(second.reference.ends_with("-C001-002"));

    let err = ctx
        .services
        .courriers
        .create(
            CreateCourrier {
                entity_id: fixture.entity.id,
                doc_type: "letter".to_string(),
                client_id: fixture.client.id,
                notes: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
