//! Follow-up ("relance") scheduling.
//!
//! The scheduler is invoked only at document creation and on status
//! transitions, never on unrelated edits. When a relance date already
//! exists the new date extends from it rather than from now; a document
//! with no relance yet starts from now. Terminal or un-configured statuses
//! clear the date.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::audit_log::EntityKind;
use crate::entities::offer::{self, OfferStatus};
use crate::entities::opportunity::{self, OpportunityStatus};
use crate::entities::client;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Per-status follow-up delays, in days.
pub const OPPORTUNITY_DELAYS: &[(OpportunityStatus, i64)] = &[
    (OpportunityStatus::Prospect, 14),
    (OpportunityStatus::Qualification, 10),
    (OpportunityStatus::Proposition, 7),
    (OpportunityStatus::Negotiation, 5),
];

pub const OFFER_DELAYS: &[(OfferStatus, i64)] = &[(OfferStatus::Sent, 7)];

pub fn delay_for<S: PartialEq + Copy>(table: &[(S, i64)], status: S) -> Option<i64> {
    table
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, days)| *days)
}

/// Computes the next follow-up date for a document.
///
/// Returns None for terminal statuses and statuses with no configured
/// delay. Otherwise the base date is the existing relance when present,
/// else `now`.
pub fn next_relance<S: PartialEq + Copy>(
    table: &[(S, i64)],
    terminal: bool,
    status: S,
    existing: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if terminal {
        return None;
    }
    let days = delay_for(table, status)?;
    Some(existing.unwrap_or(now) + Duration::days(days))
}

/// True when a follow-up is due: a date is set, it is not in the future,
/// and the document is still in flight.
pub fn is_due(relance: Option<DateTime<Utc>>, terminal: bool, now: DateTime<Utc>) -> bool {
    match relance {
        Some(due) => !terminal && due <= now,
        None => false,
    }
}

/// One due follow-up, ready to hand to the notification sink.
#[derive(Debug, Clone)]
pub struct DueItem {
    pub kind: EntityKind,
    pub id: Uuid,
    pub reference: String,
    pub client_name: String,
    pub due_date: DateTime<Utc>,
    pub amount: Option<Decimal>,
    pub status: String,
}

#[derive(Clone)]
pub struct RelanceScheduler {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl RelanceScheduler {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// All non-terminal documents whose follow-up date is due at `as_of`,
    /// ordered by due date ascending.
    #[instrument(skip(self))]
    pub async fn list_due(&self, as_of: DateTime<Utc>) -> Result<Vec<DueItem>, ServiceError> {
        let opportunities = opportunity::Entity::find()
            .filter(opportunity::Column::Relance.is_not_null())
            .filter(opportunity::Column::Relance.lte(as_of))
            .filter(
                opportunity::Column::Status
                    .is_not_in([OpportunityStatus::Won, OpportunityStatus::Lost]),
            )
            .order_by_asc(opportunity::Column::Relance)
            .all(&*self.db)
            .await?;

        let offers = offer::Entity::find()
            .filter(offer::Column::Relance.is_not_null())
            .filter(offer::Column::Relance.lte(as_of))
            .filter(offer::Column::Status.is_not_in([OfferStatus::Won, OfferStatus::Lost]))
            .order_by_asc(offer::Column::Relance)
            .all(&*self.db)
            .await?;

        let mut client_ids: Vec<Uuid> = opportunities.iter().map(|o| o.client_id).collect();
        client_ids.extend(offers.iter().map(|o| o.client_id));
        client_ids.sort_unstable();
        client_ids.dedup();

        let client_names: HashMap<Uuid, String> = client::Entity::find()
            .filter(client::Column::Id.is_in(client_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let name_of = |id: Uuid| client_names.get(&id).cloned().unwrap_or_default();

        let mut due: Vec<DueItem> = opportunities
            .into_iter()
            .filter_map(|o| {
                o.relance.map(|due_date| DueItem {
                    kind: EntityKind::Opportunity,
                    id: o.id,
                    reference: o.reference,
                    client_name: name_of(o.client_id),
                    due_date,
                    amount: Some(o.estimated_amount),
                    status: o.status.to_string(),
                })
            })
            .collect();

        due.extend(offers.into_iter().filter_map(|o| {
            o.relance.map(|due_date| DueItem {
                kind: EntityKind::Offer,
                id: o.id,
                reference: o.reference,
                client_name: name_of(o.client_id),
                due_date,
                amount: Some(o.amount),
                status: o.status.to_string(),
            })
        }));

        due.sort_by_key(|item| item.due_date);
        Ok(due)
    }

    /// Emits one `RelanceRequise` event per due item. Fire-and-forget: a
    /// sink failure is logged and does not affect the result.
    #[instrument(skip(self))]
    pub async fn dispatch_due(&self, as_of: DateTime<Utc>) -> Result<usize, ServiceError> {
        let due = self.list_due(as_of).await?;
        let count = due.len();

        for item in due {
            self.events
                .send_or_log(Event::RelanceRequise {
                    entity_ref: item.reference,
                    entity_kind: item.kind,
                    client_name: item.client_name,
                    due_date: item.due_date,
                    amount: item.amount,
                    status: item.status,
                })
                .await;
        }

        if count > 0 {
            info!(count, "dispatched due follow-ups");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn first_relance_counts_from_now() {
        let next = next_relance(OFFER_DELAYS, false, OfferStatus::Sent, None, t0());
        assert_eq!(next, Some(t0() + Duration::days(7)));
    }

    #[test]
    fn existing_relance_is_the_base_date() {
        let existing = t0() + Duration::days(7);
        let next = next_relance(OFFER_DELAYS, false, OfferStatus::Sent, Some(existing), t0());
        assert_eq!(next, Some(existing + Duration::days(7)));
    }

    #[test]
    fn terminal_status_clears_relance() {
        let existing = Some(t0());
        assert_eq!(
            next_relance(OFFER_DELAYS, true, OfferStatus::Won, existing, t0()),
            None
        );
    }

    #[test]
    fn unconfigured_status_clears_relance() {
        assert_eq!(
            next_relance(OFFER_DELAYS, false, OfferStatus::Draft, Some(t0()), t0()),
            None
        );
    }

    #[test]
    fn opportunity_delays_match_pipeline_stages() {
        assert_eq!(
            delay_for(OPPORTUNITY_DELAYS, OpportunityStatus::Prospect),
            Some(14)
        );
        assert_eq!(
            delay_for(OPPORTUNITY_DELAYS, OpportunityStatus::Negotiation),
            Some(5)
        );
        assert_eq!(delay_for(OPPORTUNITY_DELAYS, OpportunityStatus::Won), None);
    }

    #[test]
    fn due_requires_past_date_and_live_status() {
        let past = Some(t0() - Duration::hours(1));
        let future = Some(t0() + Duration::hours(1));
        assert!(is_due(past, false, t0()));
        assert!(!is_due(future, false, t0()));
        assert!(!is_due(past, true, t0()));
        assert!(!is_due(None, false, t0()));
    }
}
