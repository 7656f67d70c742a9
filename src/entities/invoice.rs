use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentStatus;

/// Financial ledger entry, one per affaire. Created by the cascade in DRAFT,
/// seeded with the affaire's sequence number.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub reference: String,
    pub sequence_number: i32,

    pub entity_id: Uuid,
    pub client_id: Uuid,
    pub affaire_id: Uuid,

    pub amount: Decimal,

    pub status: DocumentStatus,
    pub status_dates: Json,
    pub validated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::affaire::Entity",
        from = "Column::AffaireId",
        to = "super::affaire::Column::Id"
    )]
    Affaire,
}

impl Related<super::affaire::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Affaire.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
