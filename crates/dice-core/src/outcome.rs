//! Per-attempt face accumulator and the target-sum verdict.

use serde::{Deserialize, Serialize};

use crate::config::FACES;

/// Sentinel for a slot whose die has not settled yet.
pub const UNRESOLVED: u8 = 0;

/// Error type for invalid outcome updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutcomeError {
    #[error("die index {index} out of range for {len} dice")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("face value {0} is not a die face")]
    InvalidFace(u8),
    #[error("die {index} already resolved to {value}")]
    AlreadyResolved { index: usize, value: u8 },
}

/// Decision of the acceptance policy for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Unresolved dice can still make or break the target.
    Pending,
    /// Every die resolved and the sum hits the target.
    Accept,
    /// The target is out of reach; start a new attempt.
    Reject,
}

/// Face values recorded during one resolution attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeState {
    faces: Vec<u8>,
}

impl OutcomeState {
    /// Creates an all-unresolved state for `die_count` dice.
    pub fn new(die_count: usize) -> Self {
        Self {
            faces: vec![UNRESOLVED; die_count],
        }
    }

    /// Marks every slot unresolved and resizes to `die_count`.
    pub fn reset(&mut self, die_count: usize) {
        self.faces.clear();
        self.faces.resize(die_count, UNRESOLVED);
    }

    /// Records the settled face of die `index`.
    pub fn record_face(&mut self, index: usize, value: u8) -> Result<(), OutcomeError> {
        if !(1..=6).contains(&value) {
            return Err(OutcomeError::InvalidFace(value));
        }
        let len = self.faces.len();
        let slot = self
            .faces
            .get_mut(index)
            .ok_or(OutcomeError::IndexOutOfRange { index, len })?;
        if *slot != UNRESOLVED {
            return Err(OutcomeError::AlreadyResolved {
                index,
                value: *slot,
            });
        }
        *slot = value;
        Ok(())
    }

    /// Sum of the resolved slots.
    pub fn sum(&self) -> u32 {
        self.faces.iter().map(|&v| u32::from(v)).sum()
    }

    pub fn all_resolved(&self) -> bool {
        self.faces.iter().all(|&v| v != UNRESOLVED)
    }

    pub fn any_unresolved(&self) -> bool {
        !self.all_resolved()
    }

    pub fn resolved_count(&self) -> usize {
        self.faces.iter().filter(|&&v| v != UNRESOLVED).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.faces.len() - self.resolved_count()
    }

    /// Face of die `index`, `None` while unresolved.
    pub fn face(&self, index: usize) -> Option<u8> {
        self.faces.get(index).copied().filter(|&v| v != UNRESOLVED)
    }

    /// All slots, with `UNRESOLVED` for dice still moving.
    pub fn faces(&self) -> &[u8] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Judges the attempt against `target`.
    ///
    /// Each unresolved die will add between 1 and 6, so the attempt is
    /// rejected as soon as `target` leaves `[sum + r, sum + 6r]` for `r`
    /// unresolved dice. With nothing left to settle this is `sum == target`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn verdict(&self, target: u32) -> Verdict {
        let sum = self.sum();
        let remaining = self.unresolved_count() as u32;
        let reachable = (sum + remaining)..=(sum + remaining * FACES);

        if !reachable.contains(&target) {
            Verdict::Reject
        } else if remaining == 0 {
            Verdict::Accept
        } else {
            Verdict::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(faces: &[u8]) -> OutcomeState {
        let mut state = OutcomeState::new(faces.len());
        for (index, &value) in faces.iter().enumerate() {
            if value != UNRESOLVED {
                state.record_face(index, value).unwrap();
            }
        }
        state
    }

    #[test]
    fn test_new_state_is_unresolved() {
        let state = OutcomeState::new(3);
        assert_eq!(state.faces(), &[0, 0, 0]);
        assert!(state.any_unresolved());
        assert!(!state.all_resolved());
        assert_eq!(state.sum(), 0);
    }

    #[test]
    fn test_record_and_sum() {
        let mut state = OutcomeState::new(2);
        state.record_face(1, 4).unwrap();
        assert_eq!(state.sum(), 4);
        assert_eq!(state.face(0), None);
        assert_eq!(state.face(1), Some(4));
        assert_eq!(state.resolved_count(), 1);

        state.record_face(0, 2).unwrap();
        assert!(state.all_resolved());
        assert_eq!(state.sum(), 6);
    }

    #[test]
    fn test_record_twice_is_rejected() {
        let mut state = OutcomeState::new(2);
        state.record_face(0, 3).unwrap();
        assert_eq!(
            state.record_face(0, 5),
            Err(OutcomeError::AlreadyResolved { index: 0, value: 3 })
        );
        assert_eq!(state.face(0), Some(3));
    }

    #[test]
    fn test_record_rejects_bad_input() {
        let mut state = OutcomeState::new(2);
        assert_eq!(state.record_face(0, 0), Err(OutcomeError::InvalidFace(0)));
        assert_eq!(state.record_face(0, 7), Err(OutcomeError::InvalidFace(7)));
        assert_eq!(
            state.record_face(2, 1),
            Err(OutcomeError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_reset_clears_previous_attempt() {
        let mut state = outcome(&[6, 6, 5]);
        state.reset(3);
        assert_eq!(state.faces(), &[0, 0, 0]);

        state.reset(5);
        assert_eq!(state.len(), 5);
        assert!(state.faces().iter().all(|&v| v == UNRESOLVED));

        state.reset(1);
        assert_eq!(state.faces(), &[0]);
    }

    #[test]
    fn test_single_die_verdict() {
        assert_eq!(outcome(&[0]).verdict(6), Verdict::Pending);
        assert_eq!(outcome(&[6]).verdict(6), Verdict::Accept);
        for face in 1..=5 {
            assert_eq!(outcome(&[face]).verdict(6), Verdict::Reject);
        }
    }

    #[test]
    fn test_two_dice_minimum_target() {
        assert_eq!(outcome(&[1, 0]).verdict(2), Verdict::Pending);
        assert_eq!(outcome(&[1, 1]).verdict(2), Verdict::Accept);
        assert_eq!(outcome(&[1, 2]).verdict(2), Verdict::Reject);
        assert_eq!(outcome(&[2, 0]).verdict(2), Verdict::Reject);
    }

    #[test]
    fn test_one_die_already_at_target_rejects() {
        // Five alone already meets two; the other die can only add.
        assert_eq!(outcome(&[5, 0]).verdict(2), Verdict::Reject);
        assert_eq!(outcome(&[0, 5]).verdict(5), Verdict::Reject);
        assert_eq!(outcome(&[0, 4]).verdict(5), Verdict::Pending);
    }

    #[test]
    fn test_many_dice_prune_on_overshoot() {
        assert_eq!(outcome(&[6, 6, 0, 0]).verdict(12), Verdict::Reject);
        assert_eq!(outcome(&[6, 4, 0, 0]).verdict(12), Verdict::Pending);
        assert_eq!(outcome(&[6, 4, 1, 1]).verdict(12), Verdict::Accept);
        assert_eq!(outcome(&[6, 4, 1, 2]).verdict(12), Verdict::Reject);
    }

    #[test]
    fn test_prunes_when_target_out_of_reach_above() {
        // Even two sixes cannot bring 1 up to 15.
        assert_eq!(outcome(&[1, 0, 0]).verdict(15), Verdict::Reject);
        assert_eq!(outcome(&[3, 0, 0]).verdict(16), Verdict::Reject);
        assert_eq!(outcome(&[3, 0, 0]).verdict(15), Verdict::Pending);
    }

    #[test]
    fn test_accept_implies_sum_matches() {
        for a in 1..=6u8 {
            for b in 1..=6u8 {
                for target in 2..=12 {
                    let state = outcome(&[a, b]);
                    if state.verdict(target) == Verdict::Accept {
                        assert_eq!(state.sum(), target);
                    }
                }
            }
        }
    }
}
