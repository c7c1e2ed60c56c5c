//! Fuzzing inputs: ordered intent sequences plus parent resend bookkeeping.

use crate::types::TxIntent;
use serde::{Deserialize, Serialize};

/// An ordered sequence of intents forming one test case, plus the positions of
/// intents from the *parent* input that must be re-sent to rebuild the base
/// pool state before this input is applied.
///
/// An empty sequence denotes the initial seed. Every index in
/// `resend_indices` refers into the parent's sequence, never this one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    /// Intents to send, in order.
    pub sequence: Vec<TxIntent>,
    /// Positions in the parent input whose intents survived in the parent's
    /// observed pool. Sorted and deduplicated.
    pub resend_indices: Vec<usize>,
}

impl Input {
    /// The empty initial-seed input.
    pub const fn empty() -> Self {
        Self { sequence: Vec::new(), resend_indices: Vec::new() }
    }

    /// Creates an input from a sequence with no parent resends.
    pub const fn new(sequence: Vec<TxIntent>) -> Self {
        Self { sequence, resend_indices: Vec::new() }
    }

    /// Creates an input with parent resend positions; indices are sorted and
    /// deduplicated.
    pub fn with_resends(sequence: Vec<TxIntent>, mut resend_indices: Vec<usize>) -> Self {
        resend_indices.sort_unstable();
        resend_indices.dedup();
        Self { sequence, resend_indices }
    }

    /// Whether this is the sentinel initial-seed input.
    pub fn is_initial(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Iterator over the nonce-0 (parent) intents of the sequence.
    pub fn parents(&self) -> impl Iterator<Item = &TxIntent> {
        self.sequence.iter().filter(|intent| intent.nonce == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxClass;
    use alloy_primitives::Address;

    fn intent(nonce: u64) -> TxIntent {
        TxIntent::legacy(0, Address::repeat_byte(1), nonce, 5, 10)
    }

    #[test]
    fn resend_indices_are_normalized() {
        let input = Input::with_resends(vec![intent(0)], vec![3, 1, 3, 0]);
        assert_eq!(input.resend_indices, vec![0, 1, 3]);
    }

    #[test]
    fn initial_input_is_empty() {
        assert!(Input::empty().is_initial());
        assert!(!Input::new(vec![intent(0)]).is_initial());
    }

    #[test]
    fn parents_filters_nonce_zero() {
        let input = Input::new(vec![intent(0), intent(1), intent(0)]);
        assert_eq!(input.parents().count(), 2);
        assert!(input.parents().all(|i| i.class == TxClass::Legacy));
    }
}
