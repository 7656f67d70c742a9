use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::audit_log::{self, AuditAction, EntityKind};
use crate::entities::status_change;
use crate::errors::ServiceError;

/// Append-only audit trail keyed by the explicit `(entity_kind, entity_id)`
/// composite. The type exposes no update or delete operation; history is
/// immutable once written.
#[derive(Clone)]
pub struct AuditTrail {
    db: Arc<DatabaseConnection>,
}

impl AuditTrail {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Appends an audit row on the service's own connection.
    #[instrument(skip(self, changes))]
    pub async fn record(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        action: AuditAction,
        actor: Option<&str>,
        changes: Option<serde_json::Value>,
    ) -> Result<audit_log::Model, ServiceError> {
        self.record_in(&*self.db, kind, entity_id, action, actor, changes)
            .await
    }

    /// Appends an audit row inside the caller's transaction so the record
    /// commits atomically with the change it describes.
    pub async fn record_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: EntityKind,
        entity_id: Uuid,
        action: AuditAction,
        actor: Option<&str>,
        changes: Option<serde_json::Value>,
    ) -> Result<audit_log::Model, ServiceError> {
        let row = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity_kind: Set(kind),
            entity_id: Set(entity_id),
            action: Set(action),
            actor: Set(actor.map(str::to_string)),
            changes: Set(changes),
            created_at: Set(Utc::now()),
        };
        let model = row.insert(conn).await?;
        Ok(model)
    }

    /// Appends a status-change history row inside the caller's transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_status_change_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: EntityKind,
        entity_id: Uuid,
        old_status: &str,
        new_status: &str,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<status_change::Model, ServiceError> {
        let row = status_change::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity_kind: Set(kind),
            entity_id: Set(entity_id),
            old_status: Set(old_status.to_string()),
            new_status: Set(new_status.to_string()),
            actor: Set(actor.map(str::to_string)),
            comment: Set(comment.map(str::to_string)),
            created_at: Set(Utc::now()),
        };
        let model = row.insert(conn).await?;
        Ok(model)
    }

    /// Audit history for one entity, newest first.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<audit_log::Model>, ServiceError> {
        let rows = audit_log::Entity::find()
            .filter(audit_log::Column::EntityKind.eq(kind))
            .filter(audit_log::Column::EntityId.eq(entity_id))
            .order_by_desc(audit_log::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Status-transition history for one entity, newest first.
    #[instrument(skip(self))]
    pub async fn status_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<status_change::Model>, ServiceError> {
        let rows = status_change::Entity::find()
            .filter(status_change::Column::EntityKind.eq(kind))
            .filter(status_change::Column::EntityId.eq(entity_id))
            .order_by_desc(status_change::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }
}
