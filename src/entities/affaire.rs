use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the possible statuses of a contracted project.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AffaireStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "VALIDATED")]
    Validated,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "PAUSED")]
    Paused,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Contracted execution unit created from a won offer. Validating it spawns
/// the per-product reports, any training records and the initial invoice.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affaires")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub reference: String,
    pub sequence_number: i32,

    pub entity_id: Uuid,
    pub client_id: Uuid,
    pub offer_id: Uuid,

    pub status: AffaireStatus,
    pub status_dates: Json,

    pub start_date: DateTime<Utc>,
    pub expected_end_date: Option<DateTime<Utc>>,
    /// Required before the affaire may reach DONE.
    pub actual_end_date: Option<DateTime<Utc>>,

    pub total_amount: Decimal,
    pub invoiced_amount: Decimal,
    pub paid_amount: Decimal,

    /// Percentage of child reports validated; derived, 0-100.
    pub progress: i32,

    pub notes: Option<String>,
    pub responsable: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::offer::Entity",
        from = "Column::OfferId",
        to = "super::offer::Column::Id"
    )]
    Offer,
    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
}

impl Related<super::offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offer.def()
    }
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn remaining_to_invoice(&self) -> Decimal {
        self.total_amount - self.invoiced_amount
    }

    pub fn remaining_to_pay(&self) -> Decimal {
        self.invoiced_amount - self.paid_amount
    }
}
