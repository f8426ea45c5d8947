use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The lifecycle state of a settlement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeState {
    /// Verification has not yet produced a terminal verdict.
    Pending,
    /// The reference satisfied the obligation. Final state.
    Accepted,
    /// The reference did not satisfy the obligation. Final state.
    Rejected,
    /// The reconciliation horizon elapsed. Final, human-reviewable state.
    Expired,
}

impl OutcomeState {
    /// Whether this is a final (terminal) state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Expired)
    }
}

impl fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Accepted => write!(f, "Accepted"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

/// Events that drive a settlement outcome to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEvent {
    /// Verification confirmed the reference satisfies the obligation.
    Accept,
    /// Verification produced a terminal negative verdict.
    Reject,
    /// The reconciliation horizon elapsed.
    Expire,
}

/// Manages settlement outcome transitions.
///
/// Valid transitions:
/// - Pending → Accepted (Accept)
/// - Pending → Rejected (Reject)
/// - Pending → Expired (Expire)
///
/// No transition leaves a terminal state; a late confirmation can never
/// flip an Expired outcome to Accepted.
pub struct OutcomeStateMachine;

impl OutcomeStateMachine {
    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(current: OutcomeState, event: OutcomeEvent) -> Result<OutcomeState, CoreError> {
        let new_state = match (current, event) {
            (OutcomeState::Pending, OutcomeEvent::Accept) => OutcomeState::Accepted,
            (OutcomeState::Pending, OutcomeEvent::Reject) => OutcomeState::Rejected,
            (OutcomeState::Pending, OutcomeEvent::Expire) => OutcomeState::Expired,
            _ => {
                let target = match event {
                    OutcomeEvent::Accept => OutcomeState::Accepted,
                    OutcomeEvent::Reject => OutcomeState::Rejected,
                    OutcomeEvent::Expire => OutcomeState::Expired,
                };
                return Err(CoreError::InvalidOutcomeTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "settlement outcome transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: OutcomeState, event: OutcomeEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

/// The lifecycle status of a member payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// Created at plan commit, not yet paid out.
    Pending,
    /// The payout reached the member. Final state.
    Succeeded,
    /// The payout attempt failed. Final state.
    Failed,
    /// The payout was cancelled before any attempt. Final state.
    Cancelled,
}

impl PayoutStatus {
    /// Whether this is a final (terminal) status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Manages member payout transitions.
///
/// Valid transitions:
/// - Pending → Succeeded
/// - Pending → Failed
/// - Pending → Cancelled
///
/// Each payout transitions independently of its siblings.
pub struct PayoutStateMachine;

impl PayoutStateMachine {
    /// Attempt to move a payout to the requested status.
    /// Returns the new status on success, or an error for invalid transitions.
    pub fn transition(
        current: PayoutStatus,
        requested: PayoutStatus,
    ) -> Result<PayoutStatus, CoreError> {
        match (current, requested) {
            (PayoutStatus::Pending, PayoutStatus::Succeeded)
            | (PayoutStatus::Pending, PayoutStatus::Failed)
            | (PayoutStatus::Pending, PayoutStatus::Cancelled) => {
                tracing::debug!(from = %current, to = %requested, "payout transition");
                Ok(requested)
            }
            _ => Err(CoreError::InvalidPayoutTransition {
                from: current,
                to: requested,
            }),
        }
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: PayoutStatus, requested: PayoutStatus) -> bool {
        Self::transition(current, requested).is_ok()
    }
}
