use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::{client, courrier, entity, ENTITY_CODE_RE};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::AuditTrail;
use crate::services::references;
use crate::services::sequences::{ScopeKey, SequenceAllocator};

#[derive(Debug, Clone)]
pub struct CreateCourrier {
    pub entity_id: Uuid,
    pub doc_type: String,
    pub client_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct CourrierService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceAllocator,
    audit: AuditTrail,
    events: EventSender,
}

impl CourrierService {
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

    /// Registers a correspondence record with a dash-delimited reference
    /// sequenced per (entity, doc type, day, client).
    #[instrument(skip(self, input), fields(doc_type = %input.doc_type))]
    pub async fn create(
        &self,
        input: CreateCourrier,
        actor: Option<&str>,
    ) -> Result<courrier::Model, ServiceError> {
        if !ENTITY_CODE_RE.is_match(&input.doc_type) {
            return Err(ServiceError::ValidationError(format!(
                "courrier doc type must be a 3-letter code, got {:?}",
                input.doc_type
            )));
        }

        let entity = entity::Entity::find_by_id(input.entity_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("entity {}", input.entity_id)))?;
        let client = client::Entity::find_by_id(input.client_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("client {}", input.client_id)))?;

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::daily_client(
                &entity.code,
                &input.doc_type,
                now,
                &client.c_num,
            ))
            .await?;
        let reference =
            references::courrier_reference(&entity.code, &input.doc_type, now, &client.c_num, seq);

        let id = Uuid::new_v4();
        let model = courrier::ActiveModel {
            id: Set(id),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            doc_type: Set(input.doc_type),
            client_id: Set(client.id),
            notes: Set(input.notes),
            created_at: Set(now),
            created_by: Set(actor.map(str::to_string)),
        }
        .insert(&*self.db)
        .await?;

        self.audit
            .record(EntityKind::Courrier, id, AuditAction::Create, actor, None)
            .await?;
        self.events
            .send_or_log(Event::DocumentCreated {
                kind: EntityKind::Courrier,
                id,
                reference: reference.clone(),
            })
            .await;

        info!(courrier_ref = %reference, "courrier registered");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<courrier::Model>, ServiceError> {
        Ok(courrier::Entity::find_by_id(id).one(&*self.db).await?)
    }
}
