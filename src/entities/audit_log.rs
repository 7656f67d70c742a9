use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit enumeration of trackable entity kinds.
///
/// Audit and status-history rows reference their subject through the
/// `(entity_kind, entity_id)` composite, never through a dynamic foreign key.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    #[sea_orm(string_value = "OPPORTUNITY")]
    Opportunity,
    #[sea_orm(string_value = "OFFER")]
    Offer,
    #[sea_orm(string_value = "PROFORMA")]
    Proforma,
    #[sea_orm(string_value = "AFFAIRE")]
    Affaire,
    #[sea_orm(string_value = "REPORT")]
    Report,
    #[sea_orm(string_value = "FORMATION")]
    Formation,
    #[sea_orm(string_value = "ATTESTATION")]
    Attestation,
    #[sea_orm(string_value = "INVOICE")]
    Invoice,
    #[sea_orm(string_value = "COURRIER")]
    Courrier,
}

/// Action recorded against an entity.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    #[sea_orm(string_value = "CREATE")]
    Create,
    #[sea_orm(string_value = "UPDATE")]
    Update,
    #[sea_orm(string_value = "VALIDATE")]
    Validate,
    #[sea_orm(string_value = "REFUSE")]
    Refuse,
}

/// Append-only audit row. The service layer exposes no update or delete
/// operation for this table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub action: AuditAction,

    /// Caller-supplied actor identifier; None marks a system-initiated
    /// action, it is never inferred.
    pub actor: Option<String>,

    pub changes: Option<Json>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
