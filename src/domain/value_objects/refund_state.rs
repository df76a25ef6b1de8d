//! # Refund State
//!
//! Refund lifecycle state machine.
//!
//! # State Machine
//!
//! ```text
//! Requested → UnderReview → Approved → Processing → Completed
//!     │            │                       │  ↑
//!     │            └──→ Rejected           ↓  │
//!     ├──────────────→ Approved          Failed
//!     └──────────────→ Rejected
//! ```
//!
//! # Examples
//!
//! ```
//! use eventos::domain::value_objects::refund_state::RefundState;
//!
//! let state = RefundState::Requested;
//! assert!(state.can_transition_to(RefundState::UnderReview));
//! assert!(!state.can_transition_to(RefundState::Completed));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Refund lifecycle state.
///
/// # Terminal States
///
/// - [`Completed`](RefundState::Completed): money returned to the payer
/// - [`Rejected`](RefundState::Rejected): refused by policy or by a reviewer
///
/// `Failed` is not terminal: a failed refund can be retried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RefundState {
    /// Just requested, policy not yet evaluated.
    #[default]
    Requested = 0,

    /// Waiting for a manager to approve or reject.
    UnderReview = 1,

    /// Approved, not yet sent to the gateway.
    Approved = 2,

    /// Sent to the gateway.
    Processing = 3,

    /// Gateway confirmed the refund (terminal).
    Completed = 4,

    /// Refused (terminal).
    Rejected = 5,

    /// Gateway call failed after retries.
    Failed = 6,
}

impl RefundState {
    /// Returns true if this is a terminal state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Returns true if this state can transition to the target state.
    ///
    /// - Requested → UnderReview, Approved, Rejected
    /// - UnderReview → Approved, Rejected
    /// - Approved → Processing
    /// - Processing → Completed, Failed
    /// - Failed → Processing
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Requested, Self::UnderReview)
                | (Self::Requested, Self::Approved)
                | (Self::Requested, Self::Rejected)
                | (Self::UnderReview, Self::Approved)
                | (Self::UnderReview, Self::Rejected)
                | (Self::Approved, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Failed, Self::Processing)
        )
    }

    /// Returns the valid next states from this state.
    #[must_use]
    pub fn valid_transitions(&self) -> Vec<Self> {
        match self {
            Self::Requested => vec![Self::UnderReview, Self::Approved, Self::Rejected],
            Self::UnderReview => vec![Self::Approved, Self::Rejected],
            Self::Approved | Self::Failed => vec![Self::Processing],
            Self::Processing => vec![Self::Completed, Self::Failed],
            Self::Completed | Self::Rejected => vec![],
        }
    }

    /// Returns true while the refund still counts against the transaction's
    /// refundable amount without having been paid out yet.
    #[inline]
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        matches!(
            self,
            Self::Requested | Self::UnderReview | Self::Approved | Self::Processing | Self::Failed
        )
    }

    /// Returns the numeric value of this state.
    #[inline]
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for RefundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "REQUESTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Error returned when converting an invalid u8 to `RefundState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRefundStateError(
    /// The invalid u8 value.
    pub u8,
);

impl fmt::Display for InvalidRefundStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid refund state value: {}", self.0)
    }
}

impl std::error::Error for InvalidRefundStateError {}

impl TryFrom<u8> for RefundState {
    type Error = InvalidRefundStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Requested),
            1 => Ok(Self::UnderReview),
            2 => Ok(Self::Approved),
            3 => Ok(Self::Processing),
            4 => Ok(Self::Completed),
            5 => Ok(Self::Rejected),
            6 => Ok(Self::Failed),
            _ => Err(InvalidRefundStateError(value)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [RefundState; 7] = [
        RefundState::Requested,
        RefundState::UnderReview,
        RefundState::Approved,
        RefundState::Processing,
        RefundState::Completed,
        RefundState::Rejected,
        RefundState::Failed,
    ];

    mod transitions {
        use super::*;

        #[test]
        fn requested_can_skip_review() {
            assert!(RefundState::Requested.can_transition_to(RefundState::Approved));
        }

        #[test]
        fn approved_must_go_through_processing() {
            assert!(!RefundState::Approved.can_transition_to(RefundState::Completed));
            assert!(RefundState::Approved.can_transition_to(RefundState::Processing));
        }

        #[test]
        fn failed_can_be_retried() {
            assert!(RefundState::Failed.can_transition_to(RefundState::Processing));
            assert!(!RefundState::Failed.is_terminal());
        }

        #[test]
        fn terminal_states_have_no_transitions() {
            for state in ALL.iter().filter(|s| s.is_terminal()) {
                assert!(state.valid_transitions().is_empty());
            }
        }

        #[test]
        fn valid_transitions_agree_with_can_transition_to() {
            for from in ALL {
                for to in ALL {
                    assert_eq!(
                        from.can_transition_to(to),
                        from.valid_transitions().contains(&to),
                        "{from} -> {to}"
                    );
                }
            }
        }
    }

    mod conversion {
        use super::*;

        #[test]
        fn u8_roundtrip() {
            for state in ALL {
                assert_eq!(RefundState::try_from(state.as_u8()).unwrap(), state);
            }
        }

        #[test]
        fn invalid_u8() {
            assert_eq!(RefundState::try_from(42), Err(InvalidRefundStateError(42)));
        }

        #[test]
        fn display() {
            assert_eq!(RefundState::UnderReview.to_string(), "UNDER_REVIEW");
        }
    }
}
