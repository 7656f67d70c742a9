use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the possible statuses of a pre-sales opportunity.
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
pub enum OpportunityStatus {
    #[sea_orm(string_value = "PROSPECT")]
    Prospect,
    #[sea_orm(string_value = "QUALIFICATION")]
    Qualification,
    #[sea_orm(string_value = "PROPOSITION")]
    Proposition,
    #[sea_orm(string_value = "NEGOTIATION")]
    Negotiation,
    #[sea_orm(string_value = "WON")]
    Won,
    #[sea_orm(string_value = "LOST")]
    Lost,
}

impl OpportunityStatus {
    /// Conversion probability derived from the pipeline stage. Recomputed on
    /// every transition so the persisted row stays internally consistent.
    pub fn probability(&self) -> i32 {
        match self {
            Self::Prospect => 10,
            Self::Qualification => 30,
            Self::Proposition => 50,
            Self::Negotiation => 75,
            Self::Won => 100,
            Self::Lost => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opportunities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique, immutable reference; set once at creation.
    pub reference: String,
    pub sequence_number: i32,

    pub entity_id: Uuid,
    pub client_id: Uuid,
    pub contact_id: Uuid,
    pub principal_product_id: Uuid,

    pub estimated_amount: Decimal,
    /// Derived from status; see [`OpportunityStatus::probability`].
    pub probability: i32,

    pub status: OpportunityStatus,
    /// Status -> RFC3339 timestamp map; accumulates monotonically.
    pub status_dates: Json,

    pub description: Option<String>,
    pub client_needs: Option<String>,

    /// Next follow-up date; None once terminal.
    pub relance: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::opportunity_product::Entity")]
    Products,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::opportunity_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
