//! Appointment status state machine.
//!
//! ```text
//! Pending ──approve──▶ Approved ──complete──▶ Completed
//!    │                    │
//!    └──────cancel────────┴──────▶ Cancelled
//! ```

use crate::models::AppointmentStatus;

/// An action that moves an appointment to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Complete,
    Cancel,
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Approve => AppointmentStatus::Approved,
            Transition::Complete => AppointmentStatus::Completed,
            Transition::Cancel => AppointmentStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Cancelling something already cancelled or completed.
    AlreadyFinalized,
    /// The transition is not defined from the current status.
    NotPermitted,
}

/// Resolve the status an appointment moves to, or why it cannot move.
pub fn apply(
    current: AppointmentStatus,
    transition: Transition,
) -> Result<AppointmentStatus, Rejection> {
    use AppointmentStatus::*;

    match (current, transition) {
        (Pending, Transition::Approve) => Ok(Approved),
        (Approved, Transition::Complete) => Ok(Completed),
        (Pending | Approved, Transition::Cancel) => Ok(Cancelled),
        (Cancelled | Completed, Transition::Cancel) => Err(Rejection::AlreadyFinalized),
        (Approved | Cancelled | Completed, Transition::Approve) => Err(Rejection::NotPermitted),
        (Pending | Cancelled | Completed, Transition::Complete) => Err(Rejection::NotPermitted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_defined_transitions() {
        assert_eq!(apply(Pending, Transition::Approve), Ok(Approved));
        assert_eq!(apply(Approved, Transition::Complete), Ok(Completed));
        assert_eq!(apply(Pending, Transition::Cancel), Ok(Cancelled));
        assert_eq!(apply(Approved, Transition::Cancel), Ok(Cancelled));
    }

    #[test]
    fn test_terminal_states_never_reopen() {
        for terminal in [Cancelled, Completed] {
            assert!(terminal.is_terminal());
            assert_eq!(
                apply(terminal, Transition::Cancel),
                Err(Rejection::AlreadyFinalized)
            );
            assert_eq!(apply(terminal, Transition::Approve), Err(Rejection::NotPermitted));
            assert_eq!(apply(terminal, Transition::Complete), Err(Rejection::NotPermitted));
        }
    }

    #[test]
    fn test_skipping_approval_is_not_permitted() {
        assert_eq!(apply(Pending, Transition::Complete), Err(Rejection::NotPermitted));
        assert_eq!(apply(Approved, Transition::Approve), Err(Rejection::NotPermitted));
    }

    #[test]
    fn test_every_successful_transition_hits_its_target() {
        let all = [Pending, Approved, Cancelled, Completed];
        for current in all {
            for transition in [Transition::Approve, Transition::Complete, Transition::Cancel] {
                if let Ok(next) = apply(current, transition) {
                    assert_eq!(next, transition.target());
                }
            }
        }
    }
}
