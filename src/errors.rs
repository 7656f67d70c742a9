use serde::Serialize;
use uuid::Uuid;

use crate::entities::audit_log::EntityKind;

/// Unified error type for the document lifecycle core.
///
/// Every variant carries enough context to reject a request with a stable
/// taxonomy code plus a human-readable message. Cascade child failures are
/// deliberately NOT represented here: they travel in
/// [`crate::services::cascade::CascadeOutcome::warnings`] so a partial
/// cascade never masks the success of the parent transition.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid transition for {kind}: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
    },

    #[error("Sequence allocation conflict in scope {0} after retry budget exhausted")]
    AllocationConflict(String),

    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Stable taxonomy code for callers that match on error kinds rather
    /// than messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AllocationConflict(_) => "allocation_conflict",
            Self::MissingPrerequisite(_) => "missing_prerequisite",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::EventError(_) => "event_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// True when retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AllocationConflict(_) | Self::ConcurrentModification(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_codes_are_stable() {
        assert_eq!(ServiceError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            ServiceError::AllocationConflict("KIP/OFF/2503".into()).code(),
            "allocation_conflict"
        );
        assert_eq!(
            ServiceError::InvalidTransition {
                kind: EntityKind::Offer,
                from: "DRAFT".into(),
                to: "WON".into(),
            }
            .code(),
            "invalid_transition"
        );
    }

    #[test]
    fn transient_errors_are_flagged() {
        assert!(ServiceError::AllocationConflict("s".into()).is_transient());
        assert!(ServiceError::ConcurrentModification(Uuid::new_v4()).is_transient());
        assert!(!ServiceError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn invalid_transition_message_names_both_statuses() {
        let err = ServiceError::InvalidTransition {
            kind: EntityKind::Offer,
            from: "DRAFT".into(),
            to: "WON".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DRAFT"));
        assert!(msg.contains("WON"));
    }
}
