use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::offer::{self, OfferStatus};
use crate::entities::{client, entity, offer_product, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{StatusDates, OFFER_GRAPH};
use crate::services::audit::AuditTrail;
use crate::services::cascade::{CascadeOutcome, DocumentCascade};
use crate::services::references;
use crate::services::relance::{next_relance, OFFER_DELAYS};
use crate::services::sequences::{ScopeKey, SequenceAllocator};

/// One product line on an offer.
#[derive(Debug, Clone)]
pub struct OfferLine {
    pub product_id: Uuid,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateOffer {
    pub entity_id: Uuid,
    pub client_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub principal_product_id: Uuid,
    pub lines: Vec<OfferLine>,
    pub amount: Decimal,
    pub notes: Option<String>,
}

/// Result of a transition: the updated offer plus, when the target was a
/// cascade trigger, the outcome of the dependent-document creation.
#[derive(Debug)]
pub struct OfferTransition {
    pub offer: offer::Model,
    pub cascade: Option<CascadeOutcome>,
}

#[derive(Clone)]
pub struct OfferService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceAllocator,
    cascade: DocumentCascade,
    audit: AuditTrail,
    events: EventSender,
}

impl OfferService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequences: SequenceAllocator,
        cascade: DocumentCascade,
        audit: AuditTrail,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            sequences,
            cascade,
            audit,
            events,
        }
    }

    /// Creates an offer in DRAFT with a freshly allocated reference.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(
        &self,
        input: CreateOffer,
        actor: Option<&str>,
    ) -> Result<offer::Model, ServiceError> {
        if input.amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "offer amount cannot be negative".into(),
            ));
        }

        let entity = entity::Entity::find_by_id(input.entity_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("entity {}", input.entity_id)))?;
        let client = client::Entity::find_by_id(input.client_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("client {}", input.client_id)))?;
        let principal = product::Entity::find_by_id(input.principal_product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {}", input.principal_product_id))
            })?;

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly_client(&entity.code, "OFF", now, client.id))
            .await?;
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "OFF", client.id))
            .await?;
        let reference = references::offer_reference(
            &entity.code,
            &client.c_num,
            now,
            &principal.code,
            ordinal,
            seq,
        );

        let mut dates = StatusDates::default();
        dates.stamp(OfferStatus::Draft, now);

        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let model = offer::ActiveModel {
            id: Set(id),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            contact_id: Set(input.contact_id),
            principal_product_id: Set(principal.id),
            amount: Set(input.amount),
            status: Set(OfferStatus::Draft),
            status_dates: Set(dates.to_json()),
            notes: Set(input.notes),
            validated_at: Set(None),
            relance: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        let mut seen = HashSet::new();
        for line in &input.lines {
            if !seen.insert(line.product_id) {
                warn!(offer_ref = %reference, product_id = %line.product_id,
                    "duplicate product line on offer, skipping");
                continue;
            }
            offer_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                offer_id: Set(id),
                product_id: Set(line.product_id),
                unit_price: Set(line.unit_price),
            }
            .insert(&txn)
            .await?;
        }

        self.audit
            .record_in(&txn, EntityKind::Offer, id, AuditAction::Create, actor, None)
            .await?;
        txn.commit().await?;

        self.events
            .send_or_log(Event::DocumentCreated {
                kind: EntityKind::Offer,
                id,
                reference: reference.clone(),
            })
            .await;

        info!(offer_ref = %reference, "offer created");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<offer::Model>, ServiceError> {
        Ok(offer::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<offer::Model>, ServiceError> {
        Ok(offer::Entity::find()
            .filter(offer::Column::Reference.eq(reference))
            .one(&*self.db)
            .await?)
    }

    pub async fn products(&self, id: Uuid) -> Result<Vec<offer_product::Model>, ServiceError> {
        Ok(offer_product::Entity::find()
            .filter(offer_product::Column::OfferId.eq(id))
            .all(&*self.db)
            .await?)
    }

    /// DRAFT -> SENT; schedules the first follow-up.
    pub async fn send(&self, id: Uuid, actor: Option<&str>) -> Result<OfferTransition, ServiceError> {
        self.transition(id, OfferStatus::Sent, actor, None).await
    }

    /// SENT -> WON; stamps the validation date and fires the cascade.
    pub async fn win(&self, id: Uuid, actor: Option<&str>) -> Result<OfferTransition, ServiceError> {
        self.transition(id, OfferStatus::Won, actor, None).await
    }

    pub async fn lose(
        &self,
        id: Uuid,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<OfferTransition, ServiceError> {
        self.transition(id, OfferStatus::Lost, actor, reason).await
    }

    /// Validates and applies one status transition.
    #[instrument(skip(self), fields(offer_id = %id, target = %target))]
    pub async fn transition(
        &self,
        id: Uuid,
        target: OfferStatus,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<OfferTransition, ServiceError> {
        self.transition_with_options(id, target, actor, comment, false, None)
            .await
    }

    /// Full transition entry point. `force` is the administrative override:
    /// it bypasses the edge check (never the terminal check) and is recorded
    /// as such in the audit trail.
    pub async fn transition_with_options(
        &self,
        id: Uuid,
        target: OfferStatus,
        actor: Option<&str>,
        comment: Option<&str>,
        force: bool,
        effective_date: Option<DateTime<Utc>>,
    ) -> Result<OfferTransition, ServiceError> {
        let now = Utc::now();
        let effective = effective_date.unwrap_or(now);

        let txn = self.db.begin().await?;

        let current = offer::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {}", id)))?;
        let from = current.status;

        if force {
            if OFFER_GRAPH.is_terminal(from) {
                return Err(ServiceError::InvalidTransition {
                    kind: EntityKind::Offer,
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
        } else {
            OFFER_GRAPH.ensure(EntityKind::Offer, from, target)?;
        }

        let mut dates = StatusDates::from_json(&current.status_dates);
        dates.stamp(target, effective);

        let terminal = OFFER_GRAPH.is_terminal(target);
        let relance = next_relance(OFFER_DELAYS, terminal, target, current.relance, now);
        let validated_at = if target == OfferStatus::Won {
            current.validated_at.or(Some(effective))
        } else {
            current.validated_at
        };

        let update = offer::ActiveModel {
            status: Set(target),
            status_dates: Set(dates.to_json()),
            relance: Set(relance),
            validated_at: Set(validated_at),
            updated_at: Set(Some(now)),
            version: Set(current.version + 1),
            ..Default::default()
        };

        let result = offer::Entity::update_many()
            .set(update)
            .filter(offer::Column::Id.eq(id))
            .filter(offer::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(id));
        }

        let action = match target {
            OfferStatus::Won => AuditAction::Validate,
            OfferStatus::Lost => AuditAction::Refuse,
            _ => AuditAction::Update,
        };
        let changes = serde_json::json!({
            "status": { "from": from.to_string(), "to": target.to_string() },
            "forced": force,
        });
        self.audit
            .record_in(&txn, EntityKind::Offer, id, action, actor, Some(changes))
            .await?;
        self.audit
            .record_status_change_in(
                &txn,
                EntityKind::Offer,
                id,
                &from.to_string(),
                &target.to_string(),
                actor,
                comment,
            )
            .await?;

        txn.commit().await?;

        self.events
            .send_or_log(Event::StatusChanged {
                kind: EntityKind::Offer,
                id,
                old_status: from.to_string(),
                new_status: target.to_string(),
            })
            .await;

        let updated = offer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {}", id)))?;

        // Post-commit cascade; its idempotence is the second line of defense
        // behind the version check above.
        let cascade = if target == OfferStatus::Won {
            Some(self.cascade.on_offer_won(&updated, actor).await?)
        } else {
            None
        };

        Ok(OfferTransition {
            offer: updated,
            cascade,
        })
    }
}
