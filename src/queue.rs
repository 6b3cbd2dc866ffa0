use std::collections::VecDeque;

use smallvec::SmallVec;

/// How a queued playback request is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Wait until every currently playing state is about to run out, then
    /// crossfade in.
    CompleteOthers,
    /// Skip the queue and start immediately.
    PlayNow,
}

/// A pending crossfade into a cloned slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueuedTransition {
    /// Slot index of the clone awaiting activation.
    pub slot: usize,
    /// Fade duration of the crossfade once promoted.
    pub fade: f32,
}

/// FIFO of pending transitions.
///
/// Every entry references a live, not-yet-stopped clone slot: entries are
/// created only alongside a freshly cloned state and dropped the moment the
/// clone is promoted or stopped through any path. The mixer upholds that
/// invariant; the queue itself is plain storage.
#[derive(Debug, Default)]
pub(crate) struct TransitionQueue {
    entries: VecDeque<QueuedTransition>,
}

impl TransitionQueue {
    pub fn push(&mut self, slot: usize, fade: f32) {
        self.entries.push_back(QueuedTransition { slot, fade });
    }

    pub fn front(&self) -> Option<QueuedTransition> {
        self.entries.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<QueuedTransition> {
        self.entries.pop_front()
    }

    /// Drops every entry referencing `slot`.
    pub fn drop_slot(&mut self, slot: usize) {
        self.entries.retain(|entry| entry.slot != slot);
    }

    /// Removes every entry whose slot matches `pred`, returning the dropped
    /// slot indices in queue order.
    pub fn drain_matching(&mut self, mut pred: impl FnMut(usize) -> bool) -> SmallVec<[usize; 4]> {
        let mut dropped = SmallVec::new();
        self.entries.retain(|entry| {
            if pred(entry.slot) {
                dropped.push(entry.slot);
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Empties the queue, returning all previously pending slot indices.
    pub fn take_all(&mut self) -> SmallVec<[usize; 4]> {
        self.entries.drain(..).map(|entry| entry.slot).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let mut queue = TransitionQueue::default();
        queue.push(3, 0.5);
        queue.push(7, 1.0);

        let first = queue.pop_front().map(|entry| entry.slot);
        let second = queue.pop_front().map(|entry| entry.slot);
        assert_eq!((first, second), (Some(3), Some(7)));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn drain_matching_keeps_the_rest() {
        let mut queue = TransitionQueue::default();
        queue.push(1, 0.0);
        queue.push(2, 0.0);
        queue.push(3, 0.0);

        let dropped = queue.drain_matching(|slot| slot != 2);
        assert_eq!(dropped.as_slice(), &[1, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().map(|entry| entry.slot), Some(2));
    }

    #[test]
    fn drop_slot_removes_every_match() {
        let mut queue = TransitionQueue::default();
        queue.push(5, 0.0);
        queue.push(6, 0.0);
        queue.push(5, 1.0);

        queue.drop_slot(5);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().map(|entry| entry.slot), Some(6));
    }
}
