//! Generic finite-state engine for trackable documents.
//!
//! Each document type declares its transition graph once as a static
//! [`Graph`]: explicit edges, universal-exit targets reachable from any
//! non-terminal state, and the terminal set. Services validate every status
//! change against the graph before touching the store; there is no
//! "any to any" default.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::Json;

use crate::entities::affaire::AffaireStatus;
use crate::entities::audit_log::EntityKind;
use crate::entities::offer::OfferStatus;
use crate::entities::opportunity::OpportunityStatus;
use crate::entities::DocumentStatus;
use crate::errors::ServiceError;

/// Declared transition graph for one status enum.
pub struct Graph<S: 'static> {
    pub edges: &'static [(S, S)],
    /// Targets reachable from any non-terminal state. Intentional
    /// universal-exit edges, declared rather than defaulted.
    pub universal_exits: &'static [S],
    pub terminals: &'static [S],
}

impl<S> Graph<S>
where
    S: Copy + PartialEq + fmt::Display,
{
    pub fn is_terminal(&self, status: S) -> bool {
        self.terminals.contains(&status)
    }

    /// True when `from -> to` is a declared edge or a universal exit from a
    /// non-terminal state. Terminal states allow nothing.
    pub fn allows(&self, from: S, to: S) -> bool {
        if self.is_terminal(from) {
            return false;
        }
        if self.universal_exits.contains(&to) && from != to {
            return true;
        }
        self.edges.iter().any(|(f, t)| *f == from && *t == to)
    }

    /// Validates the edge, rejecting with the full context a caller needs
    /// to understand the refusal.
    pub fn ensure(&self, kind: EntityKind, from: S, to: S) -> Result<(), ServiceError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(ServiceError::InvalidTransition {
                kind,
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

pub static OPPORTUNITY_GRAPH: Graph<OpportunityStatus> = Graph {
    edges: &[
        (OpportunityStatus::Prospect, OpportunityStatus::Qualification),
        (
            OpportunityStatus::Qualification,
            OpportunityStatus::Proposition,
        ),
        (
            OpportunityStatus::Proposition,
            OpportunityStatus::Negotiation,
        ),
    ],
    universal_exits: &[OpportunityStatus::Won, OpportunityStatus::Lost],
    terminals: &[OpportunityStatus::Won, OpportunityStatus::Lost],
};

/// Winning requires passing through SENT; administrative overrides go
/// through the service's explicit force path, not through extra edges here.
pub static OFFER_GRAPH: Graph<OfferStatus> = Graph {
    edges: &[
        (OfferStatus::Draft, OfferStatus::Sent),
        (OfferStatus::Sent, OfferStatus::Won),
        (OfferStatus::Draft, OfferStatus::Lost),
        (OfferStatus::Sent, OfferStatus::Lost),
    ],
    universal_exits: &[],
    terminals: &[OfferStatus::Won, OfferStatus::Lost],
};

pub static AFFAIRE_GRAPH: Graph<AffaireStatus> = Graph {
    edges: &[
        (AffaireStatus::Draft, AffaireStatus::Validated),
        (AffaireStatus::Validated, AffaireStatus::InProgress),
        (AffaireStatus::InProgress, AffaireStatus::Paused),
        (AffaireStatus::Paused, AffaireStatus::InProgress),
        (AffaireStatus::InProgress, AffaireStatus::Done),
    ],
    universal_exits: &[AffaireStatus::Cancelled],
    terminals: &[AffaireStatus::Done, AffaireStatus::Cancelled],
};

/// Shared graph for proformas, reports and invoices.
pub static DOCUMENT_GRAPH: Graph<DocumentStatus> = Graph {
    edges: &[
        (DocumentStatus::Draft, DocumentStatus::Sent),
        (DocumentStatus::Sent, DocumentStatus::Validated),
        (DocumentStatus::Draft, DocumentStatus::Refused),
        (DocumentStatus::Sent, DocumentStatus::Refused),
    ],
    universal_exits: &[],
    terminals: &[DocumentStatus::Validated, DocumentStatus::Refused],
};

/// Status -> timestamp map stored as a JSON column on every trackable
/// document.
///
/// Entries record the first time each status was reached: stamping an
/// already-present status keeps the stored date, so the map accumulates
/// monotonically and an entry is never replaced with an earlier date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDates(BTreeMap<String, DateTime<Utc>>);

impl StatusDates {
    /// Reads the map from the stored JSON value, tolerating null or a
    /// malformed blob (both yield an empty map).
    pub fn from_json(value: &Json) -> Self {
        let map = serde_json::from_value(value.clone()).unwrap_or_default();
        Self(map)
    }

    pub fn to_json(&self) -> Json {
        serde_json::to_value(&self.0).unwrap_or(Json::Null)
    }

    /// Records `when` for `status` if no date is held yet. Returns true if
    /// the entry was inserted.
    pub fn stamp(&mut self, status: impl ToString, when: DateTime<Utc>) -> bool {
        let key = status.to_string();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, when);
        true
    }

    pub fn get(&self, status: impl ToString) -> Option<DateTime<Utc>> {
        self.0.get(&status.to_string()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    #[case(OfferStatus::Draft, OfferStatus::Sent, true)]
    #[case(OfferStatus::Sent, OfferStatus::Won, true)]
    #[case(OfferStatus::Sent, OfferStatus::Lost, true)]
    #[case(OfferStatus::Draft, OfferStatus::Won, false)]
    #[case(OfferStatus::Won, OfferStatus::Lost, false)]
    #[case(OfferStatus::Lost, OfferStatus::Draft, false)]
    fn offer_graph_edges(#[case] from: OfferStatus, #[case] to: OfferStatus, #[case] ok: bool) {
        assert_eq!(OFFER_GRAPH.allows(from, to), ok);
    }

    #[test]
    fn opportunity_universal_exits_skip_intermediate_stages() {
        // WON and LOST are reachable from any non-terminal state.
        assert!(OPPORTUNITY_GRAPH.allows(OpportunityStatus::Prospect, OpportunityStatus::Lost));
        assert!(OPPORTUNITY_GRAPH.allows(OpportunityStatus::Prospect, OpportunityStatus::Won));
        assert!(OPPORTUNITY_GRAPH.allows(OpportunityStatus::Negotiation, OpportunityStatus::Won));
        // But not from a terminal one.
        assert!(!OPPORTUNITY_GRAPH.allows(OpportunityStatus::Won, OpportunityStatus::Lost));
    }

    #[test]
    fn affaire_pause_resume_cycle_is_declared() {
        assert!(AFFAIRE_GRAPH.allows(AffaireStatus::InProgress, AffaireStatus::Paused));
        assert!(AFFAIRE_GRAPH.allows(AffaireStatus::Paused, AffaireStatus::InProgress));
        assert!(!AFFAIRE_GRAPH.allows(AffaireStatus::Paused, AffaireStatus::Done));
    }

    #[test]
    fn ensure_reports_both_statuses() {
        let err = OFFER_GRAPH
            .ensure(EntityKind::Offer, OfferStatus::Draft, OfferStatus::Won)
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition { ref from, ref to, .. } => {
            assert_eq!(from, "DRAFT");
            assert_eq!(to, "WON");
        });
    }

    #[test]
    fn status_dates_keep_first_stamp() {
        let mut dates = StatusDates::default();
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(1);

        assert!(dates.stamp(OfferStatus::Sent, t0));
        assert!(!dates.stamp(OfferStatus::Sent, t1));
        assert_eq!(dates.get(OfferStatus::Sent), Some(t0));
    }

    #[test]
    fn status_dates_survive_json_round_trip() {
        let mut dates = StatusDates::default();
        dates.stamp(OfferStatus::Draft, Utc::now());
        dates.stamp(OfferStatus::Sent, Utc::now());

        let restored = StatusDates::from_json(&dates.to_json());
        assert_eq!(restored, dates);
    }

    #[test]
    fn status_dates_tolerate_null_column() {
        let dates = StatusDates::from_json(&Json::Null);
        assert!(dates.is_empty());
    }
}
