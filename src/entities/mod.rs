//! sea-orm entities for the document lifecycle store.
//!
//! Status enums live next to the table they govern; [`DocumentStatus`] is
//! shared by the simple document types (proforma, report, invoice,
//! attestation) that follow the common draft/sent/validated/refused graph.

use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub mod affaire;
pub mod attestation;
pub mod audit_log;
pub mod category;
pub mod client;
pub mod contact;
pub mod courrier;
pub mod entity;
pub mod formation;
pub mod invoice;
pub mod offer;
pub mod offer_product;
pub mod opportunity;
pub mod opportunity_product;
pub mod participant;
pub mod product;
pub mod proforma;
pub mod report;
pub mod sequence_counter;
pub mod status_change;

lazy_static! {
    /// 3-letter uppercase codes: entities, categories, courrier doc types.
    pub static ref ENTITY_CODE_RE: Regex = Regex::new("^[A-Z]{3}$").unwrap();
    /// Product codes: VTE / EC prefix followed by digits.
    pub static ref PRODUCT_CODE_RE: Regex = Regex::new(r"^(VTE|EC)\d+$").unwrap();
}

/// Shared status set for the simple document types.
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
pub enum DocumentStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "VALIDATED")]
    Validated,
    #[sea_orm(string_value = "REFUSED")]
    Refused,
}
