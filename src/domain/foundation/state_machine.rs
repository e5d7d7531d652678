//! Transition table for status enums.

use super::ValidationError;

/// A status enum whose legal moves are a fixed table.
///
/// Implementors list each state's successors; the checks are derived
/// from that list so the table is the only place transitions live.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug + 'static {
    /// States reachable in one step from `self`.
    fn successors(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.successors().contains(target)
    }

    /// Returns `target` when the move is legal.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            return Ok(target);
        }
        Err(ValidationError::illegal_transition(self, target))
    }

    /// No outgoing moves. A settled payment is terminal.
    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}
