use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::affaire;
use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::report;
use crate::entities::DocumentStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{StatusDates, DOCUMENT_GRAPH};
use crate::services::affaires::compute_progress;
use crate::services::audit::AuditTrail;

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    audit: AuditTrail,
    events: EventSender,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditTrail, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<report::Model>, ServiceError> {
        Ok(report::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn for_affaire(&self, affaire_id: Uuid) -> Result<Vec<report::Model>, ServiceError> {
        Ok(report::Entity::find()
            .filter(report::Column::AffaireId.eq(affaire_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn send(&self, id: Uuid, actor: Option<&str>) -> Result<report::Model, ServiceError> {
        self.transition(id, DocumentStatus::Sent, actor, None).await
    }

    /// SENT -> VALIDATED; the parent affaire's progress is recomputed in
    /// the same transaction so the persisted pair stays consistent.
    pub async fn validate(
        &self,
        id: Uuid,
        actor: Option<&str>,
    ) -> Result<report::Model, ServiceError> {
        self.transition(id, DocumentStatus::Validated, actor, None)
            .await
    }

    pub async fn refuse(
        &self,
        id: Uuid,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<report::Model, ServiceError> {
        self.transition(id, DocumentStatus::Refused, actor, reason)
            .await
    }

    #[instrument(skip(self), fields(report_id = %id, target = %target))]
    pub async fn transition(
        &self,
        id: Uuid,
        target: DocumentStatus,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<report::Model, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let current = report::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("report {}", id)))?;
        let from = current.status;

        DOCUMENT_GRAPH.ensure(EntityKind::Report, from, target)?;

        let mut dates = StatusDates::from_json(&current.status_dates);
        dates.stamp(target, now);

        let validated_at = if target == DocumentStatus::Validated {
            current.validated_at.or(Some(now))
        } else {
            current.validated_at
        };

        let update = report::ActiveModel {
            status: Set(target),
            status_dates: Set(dates.to_json()),
            validated_at: Set(validated_at),
            updated_at: Set(Some(now)),
            version: Set(current.version + 1),
            ..Default::default()
        };

        let result = report::Entity::update_many()
            .set(update)
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(id));
        }

        // Derived field on the parent: progress follows the ratio of
        // validated reports.
        let siblings = report::Entity::find()
            .filter(report::Column::AffaireId.eq(current.affaire_id))
            .all(&txn)
            .await?;
        let progress = compute_progress(&siblings);
        let parent = affaire::Entity::find_by_id(current.affaire_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("affaire {}", current.affaire_id)))?;
        let parent_update = affaire::Entity::update_many()
            .set(affaire::ActiveModel {
                progress: Set(progress),
                updated_at: Set(Some(now)),
                version: Set(parent.version + 1),
                ..Default::default()
            })
            .filter(affaire::Column::Id.eq(parent.id))
            .filter(affaire::Column::Version.eq(parent.version))
            .exec(&txn)
            .await?;
        if parent_update.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(parent.id));
        }

        let action = match target {
            DocumentStatus::Validated => AuditAction::Validate,
            DocumentStatus::Refused => AuditAction::Refuse,
            _ => AuditAction::Update,
        };
        self.audit
            .record_in(
                &txn,
                EntityKind::Report,
                id,
                action,
                actor,
                Some(serde_json::json!({
                    "status": { "from": from.to_string(), "to": target.to_string() },
                    "affaire_progress": progress,
                })),
            )
            .await?;
        self.audit
            .record_status_change_in(
                &txn,
                EntityKind::Report,
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
                kind: EntityKind::Report,
                id,
                old_status: from.to_string(),
                new_status: target.to_string(),
            })
            .await;

        let updated = report::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("report {}", id)))?;
        Ok(updated)
    }
}
