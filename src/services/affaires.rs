use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::affaire::{self, AffaireStatus};
use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::offer::{self, OfferStatus};
use crate::entities::report;
use crate::entities::DocumentStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{StatusDates, AFFAIRE_GRAPH};
use crate::services::audit::AuditTrail;
use crate::services::cascade::{CascadeOutcome, DocumentCascade};

/// Result of a transition: the updated affaire plus the cascade outcome
/// when validation spawned children.
#[derive(Debug)]
pub struct AffaireTransition {
    pub affaire: affaire::Model,
    pub cascade: Option<CascadeOutcome>,
}

#[derive(Clone)]
pub struct AffaireService {
    db: Arc<DatabaseConnection>,
    cascade: DocumentCascade,
    audit: AuditTrail,
    events: EventSender,
}

impl AffaireService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cascade: DocumentCascade,
        audit: AuditTrail,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            cascade,
            audit,
            events,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<affaire::Model>, ServiceError> {
        Ok(affaire::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn get_by_offer(&self, offer_id: Uuid) -> Result<Option<affaire::Model>, ServiceError> {
        Ok(affaire::Entity::find()
            .filter(affaire::Column::OfferId.eq(offer_id))
            .one(&*self.db)
            .await?)
    }

    /// Materializes the affaire for a won offer through the cascade, which
    /// makes the call idempotent: an affaire already created by the offer's
    /// own win transition is returned as-is.
    #[instrument(skip(self), fields(offer_id = %offer_id))]
    pub async fn create_from_offer(
        &self,
        offer_id: Uuid,
        actor: Option<&str>,
    ) -> Result<affaire::Model, ServiceError> {
        let offer = offer::Entity::find_by_id(offer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {}", offer_id)))?;

        if offer.status != OfferStatus::Won {
            return Err(ServiceError::MissingPrerequisite(format!(
                "offer {} is {} and must be WON to open an affaire",
                offer.reference, offer.status
            )));
        }

        self.cascade.on_offer_won(&offer, actor).await?;

        self.get_by_offer(offer_id).await?.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "cascade did not materialize an affaire for offer {}",
                offer.reference
            ))
        })
    }

    /// DRAFT -> VALIDATED; spawns reports, formations and the draft invoice.
    pub async fn validate(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::Validated, actor, None, None)
            .await
    }

    pub async fn start(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::InProgress, actor, None, None)
            .await
    }

    pub async fn pause(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::Paused, actor, None, None)
            .await
    }

    pub async fn resume(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::InProgress, actor, None, None)
            .await
    }

    /// IN_PROGRESS -> DONE. The actual end date defaults to now and must
    /// not precede the start date.
    pub async fn complete(
        &self,
        id: Uuid,
        actual_end_date: Option<DateTime<Utc>>,
        actor: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::Done, actor, None, actual_end_date)
            .await
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<AffaireTransition, ServiceError> {
        self.transition(id, AffaireStatus::Cancelled, actor, reason, None)
            .await
    }

    /// Validates and applies one status transition.
    #[instrument(skip(self), fields(affaire_id = %id, target = %target))]
    pub async fn transition(
        &self,
        id: Uuid,
        target: AffaireStatus,
        actor: Option<&str>,
        comment: Option<&str>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<AffaireTransition, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let current = affaire::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("affaire {}", id)))?;
        let from = current.status;

        AFFAIRE_GRAPH.ensure(EntityKind::Affaire, from, target)?;

        // Terminal completion requires a coherent end date, checked before
        // anything is persisted.
        let actual_end_date = if target == AffaireStatus::Done {
            let end = current.actual_end_date.or(end_date).unwrap_or(now);
            if end < current.start_date {
                return Err(ServiceError::ValidationError(format!(
                    "actual end date {} precedes start date {}",
                    end, current.start_date
                )));
            }
            Some(end)
        } else {
            current.actual_end_date
        };

        let mut dates = StatusDates::from_json(&current.status_dates);
        dates.stamp(target, now);

        let update = affaire::ActiveModel {
            status: Set(target),
            status_dates: Set(dates.to_json()),
            actual_end_date: Set(actual_end_date),
            updated_at: Set(Some(now)),
            version: Set(current.version + 1),
            ..Default::default()
        };

        let result = affaire::Entity::update_many()
            .set(update)
            .filter(affaire::Column::Id.eq(id))
            .filter(affaire::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(id));
        }

        let action = match target {
            AffaireStatus::Validated => AuditAction::Validate,
            AffaireStatus::Cancelled => AuditAction::Refuse,
            _ => AuditAction::Update,
        };
        self.audit
            .record_in(
                &txn,
                EntityKind::Affaire,
                id,
                action,
                actor,
                Some(serde_json::json!({
                    "status": { "from": from.to_string(), "to": target.to_string() },
                })),
            )
            .await?;
        self.audit
            .record_status_change_in(
                &txn,
                EntityKind::Affaire,
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
                kind: EntityKind::Affaire,
                id,
                old_status: from.to_string(),
                new_status: target.to_string(),
            })
            .await;

        let updated = affaire::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("affaire {}", id)))?;

        let cascade = if target == AffaireStatus::Validated {
            Some(self.cascade.on_affaire_validated(&updated, actor).await?)
        } else {
            None
        };

        Ok(AffaireTransition {
            affaire: updated,
            cascade,
        })
    }

    /// Percentage of child reports validated, 0 when none exist.
    pub async fn progress(&self, id: Uuid) -> Result<i32, ServiceError> {
        let reports = report::Entity::find()
            .filter(report::Column::AffaireId.eq(id))
            .all(&*self.db)
            .await?;
        Ok(compute_progress(&reports))
    }
}

/// Validated reports over total reports, as an integer percentage.
pub fn compute_progress(reports: &[report::Model]) -> i32 {
    if reports.is_empty() {
        return 0;
    }
    let done = reports
        .iter()
        .filter(|r| r.status == DocumentStatus::Validated)
        .count();
    ((done * 100) / reports.len()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::prelude::Json;

    fn report_with(status: DocumentStatus) -> report::Model {
        report::Model {
            id: Uuid::new_v4(),
            reference: String::new(),
            sequence_number: 1,
            entity_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            affaire_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            status,
            status_dates: Json::Null,
            validated_at: None,
            created_at: Utc::now(),
            updated_at: None,
            created_by: None,
            version: 1,
        }
    }

    #[test]
    fn progress_is_zero_without_reports() {
        assert_eq!(compute_progress(&[]), 0);
    }

    #[test]
    fn progress_counts_validated_reports_only() {
        let reports = vec![
            report_with(DocumentStatus::Validated),
            report_with(DocumentStatus::Draft),
            report_with(DocumentStatus::Sent),
        ];
        assert_eq!(compute_progress(&reports), 33);
    }

    #[test]
    fn progress_reaches_hundred_when_all_validated() {
        let reports = vec![
            report_with(DocumentStatus::Validated),
            report_with(DocumentStatus::Validated),
        ];
        assert_eq!(compute_progress(&reports), 100);
    }
}
