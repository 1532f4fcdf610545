//! Quotation status lifecycle.
//!
//! Owns the transition table between [`QuoteStatus`] values and the status-gated
//! permission rules for updating and deleting a quotation. Everything here is a
//! pure function of its arguments.

use tracing::debug;

use crate::model::quote_status::QuoteStatus;

/// Rejections raised by the lifecycle rules. All of them are caller-input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid status")]
    InvalidStatus(String),
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("Quotations in SENT, APPROVED, or EXPIRED status cannot be updated")]
    UpdateNotAllowed(QuoteStatus),
    #[error("Only DRAFT quotations can be deleted")]
    DeleteNotAllowed(QuoteStatus),
}

/// Statuses reachable from `current` in one step.
pub fn allowed_transitions(current: QuoteStatus) -> &'static [QuoteStatus] {
    use QuoteStatus::*;
    match current {
        Draft => &[Sent, Expired],
        Sent => &[Approved, Rejected, Expired],
        Approved => &[Expired],
        Rejected => &[Draft, Expired],
        Expired => &[Draft],
    }
}

/// Whether `requested` may follow `current`. Self-transitions are never allowed.
pub fn can_transition(current: QuoteStatus, requested: QuoteStatus) -> bool {
    allowed_transitions(current).contains(&requested)
}

/// Rejects a move the transition table does not list, naming both states.
///
/// Raw input is parsed through `QuoteStatus::from_str` beforehand, so an
/// unknown value never reaches the table.
pub fn ensure_transition(current: QuoteStatus, requested: QuoteStatus) -> Result<(), LifecycleError> {
    if !can_transition(current, requested) {
        debug!(%current, %requested, "Rejected status transition");
        return Err(LifecycleError::InvalidTransition { from: current, to: requested });
    }
    Ok(())
}

/// Full-field updates are allowed only while in DRAFT or REJECTED.
pub fn ensure_updatable(current: QuoteStatus) -> Result<(), LifecycleError> {
    match current {
        QuoteStatus::Draft | QuoteStatus::Rejected => Ok(()),
        QuoteStatus::Sent | QuoteStatus::Approved | QuoteStatus::Expired => {
            Err(LifecycleError::UpdateNotAllowed(current))
        }
    }
}

/// Deletion is allowed only while in DRAFT.
pub fn ensure_deletable(current: QuoteStatus) -> Result<(), LifecycleError> {
    match current {
        QuoteStatus::Draft => Ok(()),
        _ => Err(LifecycleError::DeleteNotAllowed(current)),
    }
}
