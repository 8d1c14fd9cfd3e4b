use crate::error::FlowError;
use crate::models::Destination;

/// Phases of the interactive sign-in/sign-up flow.
///
/// `Failed` carries the surfaced error and behaves like the input phases:
/// the form is editable again and every retry is a fresh user action.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPhase {
    Idle,
    EmailSubmitting,
    PhoneNumberEntry,
    OtpPending,
    Verifying,
    Resolved(Destination),
    Failed(FlowError),
}

impl AuthPhase {
    /// Terminal: the flow has handed control back to routing.
    pub fn is_resolved(&self) -> bool {
        matches!(self, AuthPhase::Resolved(_))
    }

    /// Whether an operation is currently in flight.
    pub fn in_flight(&self) -> bool {
        matches!(self, AuthPhase::EmailSubmitting | AuthPhase::Verifying)
    }
}
