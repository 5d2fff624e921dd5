use std::fmt;

use crate::{Error, Result};

/// Ownership of a single buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Allocated and mapped, but never handed to the driver (or reclaimed by stream-off)
    Idle,
    /// Owned by the driver, which may write into it at any time
    Queued,
    /// Owned by the application, safe to read
    Held,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "idle"),
            State::Queued => write!(f, "queued"),
            State::Held => write!(f, "held"),
        }
    }
}

/// Ownership bookkeeping for a fixed pool of buffer slots
///
/// At most one slot is held at any time. Once every slot has been queued, the number of
/// queued and held slots always adds up to the pool size.
#[derive(Debug, Clone)]
pub struct Ring {
    slots: Vec<State>,
    held: Option<usize>,
}

impl Ring {
    /// Returns a ring of `len` idle slots
    pub fn new(len: usize) -> Self {
        Ring {
            slots: vec![State::Idle; len],
            held: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<State> {
        self.slots.get(index).copied()
    }

    /// Index of the slot currently on loan to the application
    pub fn held(&self) -> Option<usize> {
        self.held
    }

    /// Number of slots in the given state
    pub fn count(&self, state: State) -> usize {
        self.slots.iter().filter(|&&s| s == state).count()
    }

    /// Checks that `index` may be handed to the driver
    pub fn check_queue(&self, index: usize) -> Result<()> {
        match self.lookup(index)? {
            State::Idle | State::Held => Ok(()),
            state => Err(Error::SlotState {
                index,
                state,
                expected: State::Held,
            }),
        }
    }

    /// Records that the driver accepted `index`
    pub fn mark_queued(&mut self, index: usize) -> Result<()> {
        self.check_queue(index)?;
        self.slots[index] = State::Queued;
        if self.held == Some(index) {
            self.held = None;
        }
        Ok(())
    }

    /// Checks that no slot is on loan, so another one may be dequeued
    pub fn check_dequeue(&self) -> Result<()> {
        match self.held {
            Some(index) => Err(Error::SlotState {
                index,
                state: State::Held,
                expected: State::Queued,
            }),
            None => Ok(()),
        }
    }

    /// Records that the driver handed `index` back to the application
    pub fn mark_held(&mut self, index: usize) -> Result<()> {
        self.check_dequeue()?;
        match self.lookup(index)? {
            State::Queued => {
                self.slots[index] = State::Held;
                self.held = Some(index);
                Ok(())
            }
            state => Err(Error::SlotState {
                index,
                state,
                expected: State::Queued,
            }),
        }
    }

    /// Returns every slot to the application, as stream-off does in the driver
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = State::Idle);
        self.held = None;
    }

    fn lookup(&self, index: usize) -> Result<State> {
        self.state(index).ok_or(Error::SlotRange {
            index,
            len: self.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_ring(len: usize) -> Ring {
        let mut ring = Ring::new(len);
        for index in 0..len {
            ring.mark_queued(index).unwrap();
        }
        ring
    }

    fn assert_balanced(ring: &Ring) {
        assert!(ring.count(State::Held) <= 1);
        assert_eq!(
            ring.count(State::Queued) + ring.count(State::Held),
            ring.len()
        );
    }

    #[test]
    fn new_ring_is_idle() {
        let ring = Ring::new(4);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.count(State::Idle), 4);
        assert_eq!(ring.held(), None);
    }

    #[test]
    fn cycle_keeps_invariant() {
        let mut ring = queued_ring(4);
        assert_balanced(&ring);

        for i in 0..100 {
            let index = i % 4;
            ring.mark_held(index).unwrap();
            assert_eq!(ring.held(), Some(index));
            assert_balanced(&ring);

            ring.mark_queued(index).unwrap();
            assert_eq!(ring.held(), None);
            assert_balanced(&ring);
        }
    }

    #[test]
    fn second_dequeue_is_rejected() {
        let mut ring = queued_ring(3);
        ring.mark_held(0).unwrap();

        match ring.mark_held(1) {
            Err(Error::SlotState { index, state, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(state, State::Held);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(ring.state(1), Some(State::Queued));
    }

    #[test]
    fn queue_twice_is_rejected() {
        let mut ring = queued_ring(2);
        assert!(matches!(
            ring.mark_queued(1),
            Err(Error::SlotState {
                state: State::Queued,
                ..
            })
        ));
    }

    #[test]
    fn dequeue_of_idle_slot_is_rejected() {
        let mut ring = Ring::new(2);
        assert!(ring.mark_held(0).is_err());
    }

    #[test]
    fn out_of_range() {
        let mut ring = queued_ring(2);
        assert!(matches!(
            ring.mark_held(5),
            Err(Error::SlotRange { index: 5, len: 2 })
        ));
        assert!(ring.check_queue(2).is_err());
    }

    #[test]
    fn reset_returns_everything() {
        let mut ring = queued_ring(3);
        ring.mark_held(2).unwrap();
        ring.reset();
        assert_eq!(ring.count(State::Idle), 3);
        assert_eq!(ring.held(), None);
    }
}
