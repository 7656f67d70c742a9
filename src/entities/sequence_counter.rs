use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dedicated counter row per allocation scope.
///
/// The unique index over `(entity_code, doc_type, scope)` is the database
/// backstop against double-allocation; the allocator serializes writers per
/// scope before ever touching this table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub entity_code: String,
    pub doc_type: String,

    /// Period token ("2503"), client token ("C<uuid>"), or a composed
    /// day+client token for correspondence.
    pub scope: String,

    pub last_value: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
