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
use crate::entities::opportunity::{self, OpportunityStatus};
use crate::entities::{client, contact, entity, opportunity_product, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{StatusDates, OPPORTUNITY_GRAPH};
use crate::services::audit::AuditTrail;
use crate::services::offers::{CreateOffer, OfferLine, OfferService};
use crate::services::references;
use crate::services::relance::{next_relance, OPPORTUNITY_DELAYS};
use crate::services::sequences::{ScopeKey, SequenceAllocator};

#[derive(Debug, Clone)]
pub struct CreateOpportunity {
    pub entity_id: Uuid,
    pub client_id: Uuid,
    pub contact_id: Uuid,
    pub principal_product_id: Uuid,
    pub product_ids: Vec<Uuid>,
    pub estimated_amount: Decimal,
    pub description: Option<String>,
    pub client_needs: Option<String>,
}

#[derive(Clone)]
pub struct OpportunityService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceAllocator,
    audit: AuditTrail,
    events: EventSender,
    offers: OfferService,
}

impl OpportunityService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequences: SequenceAllocator,
        audit: AuditTrail,
        events: EventSender,
        offers: OfferService,
    ) -> Self {
        Self {
            db,
            sequences,
            audit,
            events,
            offers,
        }
    }

    /// Creates an opportunity in PROSPECT with its first follow-up already
    /// scheduled.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(
        &self,
        input: CreateOpportunity,
        actor: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        if input.estimated_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "estimated amount cannot be negative".into(),
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
        let contact = contact::Entity::find_by_id(input.contact_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("contact {}", input.contact_id)))?;
        if contact.client_id != client.id {
            return Err(ServiceError::ValidationError(format!(
                "contact {} does not belong to client {}",
                contact.id, client.c_num
            )));
        }
        let principal = product::Entity::find_by_id(input.principal_product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {}", input.principal_product_id))
            })?;

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly_client(&entity.code, "OPP", now, client.id))
            .await?;
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "OPP", client.id))
            .await?;
        let reference = references::opportunity_reference(
            &entity.code,
            &client.c_num,
            now,
            &principal.code,
            ordinal,
            seq,
        );

        let status = OpportunityStatus::Prospect;
        let mut dates = StatusDates::default();
        dates.stamp(status, now);
        let relance = next_relance(OPPORTUNITY_DELAYS, false, status, None, now);

        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let model = opportunity::ActiveModel {
            id: Set(id),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            contact_id: Set(contact.id),
            principal_product_id: Set(principal.id),
            estimated_amount: Set(input.estimated_amount),
            probability: Set(status.probability()),
            status: Set(status),
            status_dates: Set(dates.to_json()),
            description: Set(input.description),
            client_needs: Set(input.client_needs),
            relance: Set(relance),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        let mut seen = HashSet::new();
        for product_id in &input.product_ids {
            if !seen.insert(*product_id) {
                warn!(opportunity_ref = %reference, product_id = %product_id,
                    "duplicate product on opportunity, skipping");
                continue;
            }
            opportunity_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                opportunity_id: Set(id),
                product_id: Set(*product_id),
            }
            .insert(&txn)
            .await?;
        }

        self.audit
            .record_in(
                &txn,
                EntityKind::Opportunity,
                id,
                AuditAction::Create,
                actor,
                None,
            )
            .await?;
        txn.commit().await?;

        self.events
            .send_or_log(Event::DocumentCreated {
                kind: EntityKind::Opportunity,
                id,
                reference: reference.clone(),
            })
            .await;

        info!(opportunity_ref = %reference, "opportunity created");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<opportunity::Model>, ServiceError> {
        Ok(opportunity::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn qualify(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        self.transition(id, OpportunityStatus::Qualification, actor, None)
            .await
    }

    pub async fn propose(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        self.transition(id, OpportunityStatus::Proposition, actor, None)
            .await
    }

    pub async fn negotiate(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        self.transition(id, OpportunityStatus::Negotiation, actor, None)
            .await
    }

    /// Universal exit: permitted from any non-terminal stage.
    pub async fn win(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        self.transition(id, OpportunityStatus::Won, actor, None)
            .await
    }

    /// Universal exit; the loss reason lands in the status history.
    pub async fn lose(
        &self,
        id: Uuid,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        self.transition(id, OpportunityStatus::Lost, actor, reason)
            .await
    }

    /// Validates and applies one status transition, recomputing the derived
    /// probability before persistence.
    #[instrument(skip(self), fields(opportunity_id = %id, target = %target))]
    pub async fn transition(
        &self,
        id: Uuid,
        target: OpportunityStatus,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<opportunity::Model, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let current = opportunity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("opportunity {}", id)))?;
        let from = current.status;

        OPPORTUNITY_GRAPH.ensure(EntityKind::Opportunity, from, target)?;

        let mut dates = StatusDates::from_json(&current.status_dates);
        dates.stamp(target, now);

        let terminal = OPPORTUNITY_GRAPH.is_terminal(target);
        let relance = next_relance(OPPORTUNITY_DELAYS, terminal, target, current.relance, now);
        let closed_at = if terminal {
            current.closed_at.or(Some(now))
        } else {
            None
        };

        let update = opportunity::ActiveModel {
            status: Set(target),
            status_dates: Set(dates.to_json()),
            probability: Set(target.probability()),
            relance: Set(relance),
            closed_at: Set(closed_at),
            updated_at: Set(Some(now)),
            version: Set(current.version + 1),
            ..Default::default()
        };

        let result = opportunity::Entity::update_many()
            .set(update)
            .filter(opportunity::Column::Id.eq(id))
            .filter(opportunity::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(id));
        }

        let changes = serde_json::json!({
            "status": { "from": from.to_string(), "to": target.to_string() },
            "probability": target.probability(),
        });
        self.audit
            .record_in(
                &txn,
                EntityKind::Opportunity,
                id,
                AuditAction::Update,
                actor,
                Some(changes),
            )
            .await?;
        self.audit
            .record_status_change_in(
                &txn,
                EntityKind::Opportunity,
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
                kind: EntityKind::Opportunity,
                id,
                old_status: from.to_string(),
                new_status: target.to_string(),
            })
            .await;

        let updated = opportunity::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("opportunity {}", id)))?;
        Ok(updated)
    }

    /// Materializes an offer from a sufficiently advanced opportunity: same
    /// client, contact and product set, amount seeded from the estimate.
    #[instrument(skip(self), fields(opportunity_id = %id))]
    pub async fn create_offer(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<crate::entities::offer::Model, ServiceError> {
        let opportunity = self
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("opportunity {}", id)))?;

        if matches!(
            opportunity.status,
            OpportunityStatus::Prospect | OpportunityStatus::Lost
        ) {
            return Err(ServiceError::MissingPrerequisite(format!(
                "opportunity {} must be at least qualified to create an offer",
                opportunity.reference
            )));
        }

        let product_ids: Vec<Uuid> = opportunity_product::Entity::find()
            .filter(opportunity_product::Column::OpportunityId.eq(id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| row.product_id)
            .collect();

        let offer = self
            .offers
            .create(
                CreateOffer {
                    entity_id: opportunity.entity_id,
                    client_id: opportunity.client_id,
                    contact_id: Some(opportunity.contact_id),
                    principal_product_id: opportunity.principal_product_id,
                    lines: product_ids
                        .into_iter()
                        .map(|product_id| OfferLine {
                            product_id,
                            unit_price: Decimal::ZERO,
                        })
                        .collect(),
                    amount: opportunity.estimated_amount,
                    notes: opportunity.description.clone(),
                },
                actor,
            )
            .await?;

        self.audit
            .record(
                EntityKind::Opportunity,
                id,
                AuditAction::Update,
                actor,
                Some(serde_json::json!({ "created_offer": offer.reference })),
            )
            .await?;

        Ok(offer)
    }
}
