use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::audit_log::{AuditAction, EntityKind};
use crate::entities::{affaire, attestation, client, entity, formation, participant, DocumentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::StatusDates;
use crate::services::audit::AuditTrail;
use crate::services::references;
use crate::services::sequences::{ScopeKey, SequenceAllocator};

#[derive(Clone)]
pub struct AttestationService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceAllocator,
    audit: AuditTrail,
    events: EventSender,
}

impl AttestationService {
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

    /// Issues the completion certificate for one participant of a
    /// formation. At most one exists per (formation, participant); re-issuing
    /// returns the existing record.
    #[instrument(skip(self), fields(formation_id = %formation_id, participant_id = %participant_id))]
    pub async fn issue(
        &self,
        formation_id: Uuid,
        participant_id: Uuid,
        details: String,
        actor: Option<&str>,
    ) -> Result<attestation::Model, ServiceError> {
        let formation = formation::Entity::find_by_id(formation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("formation {}", formation_id)))?;
        let participant = participant::Entity::find_by_id(participant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("participant {}", participant_id)))?;
        if participant.formation_id != formation.id {
            return Err(ServiceError::ValidationError(format!(
                "participant {} is not enrolled in formation {}",
                participant_id, formation_id
            )));
        }

        if let Some(existing) = attestation::Entity::find()
            .filter(attestation::Column::FormationId.eq(formation.id))
            .filter(attestation::Column::ParticipantId.eq(participant.id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let affaire = affaire::Entity::find_by_id(formation.affaire_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::MissingPrerequisite(format!(
                    "formation {} references a missing affaire",
                    formation_id
                ))
            })?;
        let entity = entity::Entity::find_by_id(affaire.entity_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("entity {}", affaire.entity_id)))?;
        let client = client::Entity::find_by_id(affaire.client_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("client {}", affaire.client_id)))?;

        let now = Utc::now();
        let seq = self
            .sequences
            .allocate(&ScopeKey::monthly_formation(
                &entity.code,
                "ATT",
                now,
                formation.id,
            ))
            .await?;
        let client_ordinal = self
            .sequences
            .allocate(&ScopeKey::client(&entity.code, "ATT", client.id))
            .await?;
        let participant_ordinal = self
            .sequences
            .allocate(&ScopeKey::formation(&entity.code, "ATT", formation.id))
            .await?;
        let reference = references::attestation_reference(
            &entity.code,
            &client.c_num,
            now,
            &affaire.reference,
            client_ordinal,
            participant_ordinal,
            seq,
        );

        let mut dates = StatusDates::default();
        dates.stamp(DocumentStatus::Draft, now);

        let id = Uuid::new_v4();
        let row = attestation::ActiveModel {
            id: Set(id),
            reference: Set(reference.clone()),
            sequence_number: Set(seq),
            entity_id: Set(entity.id),
            client_id: Set(client.id),
            affaire_id: Set(affaire.id),
            formation_id: Set(formation.id),
            participant_id: Set(participant.id),
            report_id: Set(formation.report_id),
            details_formation: Set(details),
            status: Set(DocumentStatus::Draft),
            status_dates: Set(dates.to_json()),
            created_at: Set(now),
            created_by: Set(actor.map(str::to_string)),
            version: Set(1),
        };

        let model = match row.insert(&*self.db).await {
            Ok(model) => model,
            // Unique backstop on (formation, participant).
            Err(e) => {
                if let Some(existing) = attestation::Entity::find()
                    .filter(attestation::Column::FormationId.eq(formation.id))
                    .filter(attestation::Column::ParticipantId.eq(participant.id))
                    .one(&*self.db)
                    .await?
                {
                    return Ok(existing);
                }
                return Err(e.into());
            }
        };

        self.audit
            .record(EntityKind::Attestation, id, AuditAction::Create, actor, None)
            .await?;
        self.events
            .send_or_log(Event::DocumentCreated {
                kind: EntityKind::Attestation,
                id,
                reference: reference.clone(),
            })
            .await;

        info!(attestation_ref = %reference, "attestation issued");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<attestation::Model>, ServiceError> {
        Ok(attestation::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn for_formation(
        &self,
        formation_id: Uuid,
    ) -> Result<Vec<attestation::Model>, ServiceError> {
        Ok(attestation::Entity::find()
            .filter(attestation::Column::FormationId.eq(formation_id))
            .all(&*self.db)
            .await?)
    }
}
