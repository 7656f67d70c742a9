//! Cascading creation of dependent documents.
//!
//! Invoked after a parent's transition commit. Every child is ensured via
//! get-or-create keyed by the parent's immutable identity, so re-firing the
//! cascade for the same parent and trigger is a no-op. Children are
//! independent units of work: one failure becomes a warning on the outcome
//! and never rolls back siblings or the parent transition.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::category::TRAINING_CATEGORY_CODE;
use crate::entities::{
    affaire::{self, AffaireStatus},
    category, client, entity, formation, invoice, offer, offer_product, product, proforma, report,
    DocumentStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::StatusDates;
use crate::services::audit::AuditTrail;
use crate::services::references;
use crate::services::sequences::{ScopeKey, SequenceAllocator};

/// One child document the cascade brought into existence.
#[derive(Debug, Clone)]
pub struct CreatedChild {
    pub kind: EntityKind,
    pub id: Uuid,
    pub reference: String,
}

/// A child that could not be created. Reported, never fatal.
#[derive(Debug, Clone)]
pub struct CascadeWarning {
    pub parent_reference: String,
    pub child: EntityKind,
    pub cause: String,
}

/// Aggregate result of one cascade invocation.
#[derive(Debug, Clone, Default)]
pub struct CascadeOutcome {
    pub created: Vec<CreatedChild>,
    pub warnings: Vec<CascadeWarning>,
}

impl CascadeOutcome {
    pub fn created_of(&self, kind: EntityKind) -> usize {
        self.created.iter().filter(|c| c.kind == kind).count()
    }
}

#[derive(Clone)]
pub struct DocumentCascade {
    db: Arc<DatabaseConnection>,
    sequences: SequenceAllocator,
    audit: AuditTrail,
    events: EventSender,
}

impl DocumentCascade {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequences: SequenceAllocator,
        audit: AuditTrail,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            sequences,
            audit,
            events,
        }
    }

    /// Offer reached WON: ensure the proforma and the affaire exist.
    ///
    /// # Errors
    /// `MissingPrerequisite` when the offer has no validation date; nothing
    /// is persisted in that case.
    #[instrument(skip(self, offer), fields(offer_ref = %offer.reference))]
    pub async fn on_offer_won(
        &self,
        offer: &offer::Model,
        actor: Option<&str>,
    ) -> Result<CascadeOutcome, ServiceError> {
        if offer.validated_at.is_none() {
            return Err(ServiceError::MissingPrerequisite(format!(
                "offer {} has no validation date",
                offer.reference
            )));
        }

        let entity = self.load_entity(offer.entity_id).await?;
        let client = self.load_client(offer.client_id).await?;

        let mut outcome = CascadeOutcome::default();

        match self.ensure_proforma(offer, &entity, &client, actor).await {
            Ok(Some(created)) => outcome.created.push(created),
            Ok(None) => {}
            Err(e) => {
                self.push_warning(&mut outcome, &offer.reference, EntityKind::Proforma, e)
                    .await;
            }
        }

        match self.ensure_affaire(offer, &client, actor).await {
            Ok(Some(created)) => outcome.created.push(created),
            Ok(None) => {}
            Err(e) => {
                self.push_warning(&mut outcome, &offer.reference, EntityKind::Affaire, e)
                    .await;
            }
        }

        info!(
            offer_ref = %offer.reference,
            created = outcome.created.len(),
            warnings = outcome.warnings.len(),
            "offer cascade done"
        );
        Ok(outcome)
    }

    /// Affaire reached VALIDATED: ensure one report per offer product, one
    /// formation per training product, and the initial draft invoice.
    #[instrument(skip(self, affaire), fields(affaire_ref = %affaire.reference))]
    pub async fn on_affaire_validated(
        &self,
        affaire: &affaire::Model,
        actor: Option<&str>,
    ) -> Result<CascadeOutcome, ServiceError> {
        let entity = self.load_entity(affaire.entity_id).await?;
        let client = self.load_client(affaire.client_id).await?;
        let offer = offer::Entity::find_by_id(affaire.offer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::MissingPrerequisite(format!(
                    "affaire {} references a missing offer",
                    affaire.reference
                ))
            })?;

        let lines = offer_product::Entity::find()
            .filter(offer_product::Column::OfferId.eq(offer.id))
            .all(&*self.db)
            .await?;

        let mut outcome = CascadeOutcome::default();
        let mut seen: HashSet<Uuid> = HashSet::new();

        for line in lines {
            // Duplicate source products are skipped, not retried.
            if !seen.insert(line.product_id) {
                warn!(
                    affaire_ref = %affaire.reference,
                    product_id = %line.product_id,
                    "duplicate product on offer, skipping repeat"
                );
                continue;
            }

            let (product, product_category) = match self.load_product(line.product_id).await {
                Ok(pair) => pair,
                Err(e) => {
                    self.push_warning(&mut outcome, &affaire.reference, EntityKind::Report, e)
                        .await;
                    continue;
                }
            };

            let report = match self
                .ensure_report(affaire, &product, &product_category, &entity, &client, actor)
                .await
            {
                Ok(EnsuredReport::Created(model)) => {
                    outcome.created.push(CreatedChild {
                        kind: EntityKind::Report,
                        id: model.id,
                        reference: model.reference.clone(),
                    });
                    model
                }
                Ok(EnsuredReport::Existing(model)) => model,
                Err(e) => {
                    self.push_warning(&mut outcome, &affaire.reference, EntityKind::Report, e)
                        .await;
                    continue;
                }
            };

            if product_category.code == TRAINING_CATEGORY_CODE {
                match self
                    .ensure_formation(affaire, &report, &product, &client, actor)
                    .await
                {
                    Ok(Some(created)) => outcome.created.push(created),
                    Ok(None) => {}
                    Err(e) => {
                        self.push_warning(
                            &mut outcome,
                            &affaire.reference,
                            EntityKind::Formation,
                            e,
                        )
                        .await;
                    }
                }
            }
        }

        match self
            .ensure_invoice(affaire, &offer, &entity, &client, actor)
            .await
        {
            Ok(Some(created)) => outcome.created.push(created),
            Ok(None) => {}
            Err(e) => {
                self.push_warning(&mut outcome, &affaire.reference, EntityKind::Invoice, e)
                    .await;
            }
        }

        info!(
            affaire_ref = %affaire.reference,
            created = outcome.created.len(),
            warnings = outcome.warnings.len(),
            "affaire cascade done"
        );
        Ok(outcome)
    }

    async fn ensure_proforma(
        &self,
        offer: &offer::Model,
        entity: &entity::Model,
        client: &client::Model,
        actor: Option<&str>,
    ) -> Result<Option<CreatedChild>, ServiceError> {
        let existing = proforma::Entity::find()
            .filter(proforma::Column::OfferId.eq(offer.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly(&entity.code, "PRO", now))
            .await?;
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "PRO", client.id))
            .await?;
        let reference = references::proforma_reference(
            &entity.code,
            &client.c_num,
            now,
            offer.sequence_number,
            ordinal,
            seq,
        );

        let mut dates = StatusDates::default();
        dates.stamp(DocumentStatus::Draft, now);

        let row = proforma::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            offer_id: Set(offer.id),
            status: Set(DocumentStatus::Draft),
            status_dates: Set(dates.to_json()),
            validated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        };

        match row.insert(&*self.db).await {
            Ok(model) => {
                self.child_created(EntityKind::Proforma, model.id, &model.reference, actor)
                    .await?;
                Ok(Some(CreatedChild {
                    kind: EntityKind::Proforma,
                    id: model.id,
                    reference: model.reference,
                }))
            }
            // Unique backstop: a concurrent cascade got there first.
            Err(_)
                if proforma::Entity::find()
                    .filter(proforma::Column::OfferId.eq(offer.id))
                    .one(&*self.db)
                    .await?
                    .is_some() =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_affaire(
        &self,
        offer: &offer::Model,
        client: &client::Model,
        actor: Option<&str>,
    ) -> Result<Option<CreatedChild>, ServiceError> {
        let existing = affaire::Entity::find()
            .filter(affaire::Column::OfferId.eq(offer.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly_global("AFF", now))
            .await?;
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client("*", "AFF", client.id))
            .await?;
        let reference = references::affaire_reference(now, ordinal, offer.sequence_number, seq);

        let mut dates = StatusDates::default();
        dates.stamp(AffaireStatus::Draft, now);

        let row = affaire::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(offer.entity_id),
            client_id: Set(client.id),
            offer_id: Set(offer.id),
            status: Set(AffaireStatus::Draft),
            status_dates: Set(dates.to_json()),
            start_date: Set(now),
            expected_end_date: Set(None),
            actual_end_date: Set(None),
            total_amount: Set(offer.amount),
            invoiced_amount: Set(Decimal::ZERO),
            paid_amount: Set(Decimal::ZERO),
            progress: Set(0),
            notes: Set(None),
            responsable: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        };

        match row.insert(&*self.db).await {
            Ok(model) => {
                self.child_created(EntityKind::Affaire, model.id, &model.reference, actor)
                    .await?;
                Ok(Some(CreatedChild {
                    kind: EntityKind::Affaire,
                    id: model.id,
                    reference: model.reference,
                }))
            }
            Err(_)
                if affaire::Entity::find()
                    .filter(affaire::Column::OfferId.eq(offer.id))
                    .one(&*self.db)
                    .await?
                    .is_some() =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_report(
        &self,
        affaire: &affaire::Model,
        product: &product::Model,
        product_category: &category::Model,
        entity: &entity::Model,
        client: &client::Model,
        actor: Option<&str>,
    ) -> Result<EnsuredReport, ServiceError> {
        let existing = report::Entity::find()
            .filter(report::Column::AffaireId.eq(affaire.id))
            .filter(report::Column::ProductId.eq(product.id))
            .one(&*self.db)
            .await?;
        if let Some(model) = existing {
            return Ok(EnsuredReport::Existing(model));
        }

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly(&entity.code, "RAP", now))
            .await?;
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "RAP", client.id))
            .await?;
        let category_ordinal = self
            .sequences
            .allocate(&ScopeKey::client_category(
                &entity.code,
                "RAP",
                client.id,
                &product_category.code,
            ))
            .await?;
        let reference = references::report_reference(
            &entity.code,
            &client.c_num,
            &affaire.reference,
            category_ordinal,
            &product.code,
            ordinal,
            seq,
        );

        let mut dates = StatusDates::default();
        dates.stamp(DocumentStatus::Draft, now);

        let row = report::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            affaire_id: Set(affaire.id),
            product_id: Set(product.id),
            status: Set(DocumentStatus::Draft),
            status_dates: Set(dates.to_json()),
            validated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        };

        match row.insert(&*self.db).await {
            Ok(model) => {
                self.child_created(EntityKind::Report, model.id, &model.reference, actor)
                    .await?;
                Ok(EnsuredReport::Created(model))
            }
            Err(_) => {
                // Unique backstop on (affaire, product).
                let raced = report::Entity::find()
                    .filter(report::Column::AffaireId.eq(affaire.id))
                    .filter(report::Column::ProductId.eq(product.id))
                    .one(&*self.db)
                    .await?;
                match raced {
                    Some(model) => Ok(EnsuredReport::Existing(model)),
                    None => Err(ServiceError::InternalError(format!(
                        "report insert failed for affaire {} product {}",
                        affaire.reference, product.code
                    ))),
                }
            }
        }
    }

    async fn ensure_formation(
        &self,
        affaire: &affaire::Model,
        report: &report::Model,
        product: &product::Model,
        client: &client::Model,
        actor: Option<&str>,
    ) -> Result<Option<CreatedChild>, ServiceError> {
        let existing = formation::Entity::find()
            .filter(formation::Column::ReportId.eq(report.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let title = format!("Formation {}", product.name);
        let row = formation::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.clone()),
            client_id: Set(client.id),
            affaire_id: Set(affaire.id),
            report_id: Set(report.id),
            start_date: Set(Some(affaire.start_date)),
            end_date: Set(affaire.expected_end_date),
            description: Set(Some(format!("{} pour {}", title, client.name))),
            created_at: Set(Utc::now()),
            created_by: Set(actor.map(str::to_string)),
        };

        match row.insert(&*self.db).await {
            Ok(model) => {
                self.child_created(EntityKind::Formation, model.id, &model.title, actor)
                    .await?;
                Ok(Some(CreatedChild {
                    kind: EntityKind::Formation,
                    id: model.id,
                    reference: model.title,
                }))
            }
            Err(_)
                if formation::Entity::find()
                    .filter(formation::Column::ReportId.eq(report.id))
                    .one(&*self.db)
                    .await?
                    .is_some() =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_invoice(
        &self,
        affaire: &affaire::Model,
        offer: &offer::Model,
        entity: &entity::Model,
        client: &client::Model,
        actor: Option<&str>,
    ) -> Result<Option<CreatedChild>, ServiceError> {
        let existing = invoice::Entity::find()
            .filter(invoice::Column::AffaireId.eq(affaire.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let principal = product::Entity::find_by_id(offer.principal_product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::MissingPrerequisite(format!(
                    "offer {} has no principal product",
                    offer.reference
                ))
            })?;

        let now = Utc::now();
        let ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "FAC", client.id))
            .await?;
        // The invoice inherits the affaire's sequence number; uniqueness
        // within the month follows from the affaire's own allocation.
        let seq = affaire.sequence_number;
        let reference = references::invoice_reference(
            &entity.code,
            &client.c_num,
            &affaire.reference,
            &principal.code,
            ordinal,
            seq,
        );

        let mut dates = StatusDates::default();
        dates.stamp(DocumentStatus::Draft, now);

        let row = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            affaire_id: Set(affaire.id),
            amount: Set(affaire.total_amount),
            status: Set(DocumentStatus::Draft),
            status_dates: Set(dates.to_json()),
            validated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        };

        match row.insert(&*self.db).await {
            Ok(model) => {
                self.child_created(EntityKind::Invoice, model.id, &model.reference, actor)
                    .await?;
                Ok(Some(CreatedChild {
                    kind: EntityKind::Invoice,
                    id: model.id,
                    reference: model.reference,
                }))
            }
            Err(_)
                if invoice::Entity::find()
                    .filter(invoice::Column::AffaireId.eq(affaire.id))
                    .one(&*self.db)
                    .await?
                    .is_some() =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn child_created(
        &self,
        kind: EntityKind,
        id: Uuid,
        reference: &str,
        actor: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.audit
            .record(kind, id, AuditAction::Create, actor, None)
            .await?;
        self.events
            .send_or_log(Event::DocumentCreated {
                kind,
                id,
                reference: reference.to_string(),
            })
            .await;
        Ok(())
    }

    async fn push_warning(
        &self,
        outcome: &mut CascadeOutcome,
        parent_reference: &str,
        child: EntityKind,
        error: ServiceError,
    ) {
        warn!(
            parent_ref = %parent_reference,
            child = %child,
            error = %error,
            "cascade child failed"
        );
        self.events
            .send_or_log(Event::CascadeChildFailed {
                parent_reference: parent_reference.to_string(),
                child_kind: child,
                reason: error.to_string(),
            })
            .await;
        outcome.warnings.push(CascadeWarning {
            parent_reference: parent_reference.to_string(),
            child,
            cause: error.to_string(),
        });
    }

    async fn load_entity(&self, id: Uuid) -> Result<entity::Model, ServiceError> {
        entity::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("entity {} not found", id)))
    }

    async fn load_client(&self, id: Uuid) -> Result<client::Model, ServiceError> {
        client::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("client {} not found", id)))
    }

    async fn load_product(
        &self,
        id: Uuid,
    ) -> Result<(product::Model, category::Model), ServiceError> {
        let product = product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", id)))?;
        let product_category = category::Entity::find_by_id(product.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "product {} has a dangling category",
                    product.code
                ))
            })?;
        Ok((product, product_category))
    }
}

enum EnsuredReport {
    Created(report::Model),
    Existing(report::Model),
}
