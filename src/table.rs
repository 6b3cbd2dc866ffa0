use std::sync::Arc;

use smallvec::SmallVec;

use crate::clip::AnimationClip;
use crate::state::AnimationState;

/// Slot allocator and registry owning every [`AnimationState`].
///
/// Slots are identified by stable integer indices. Insertion fills the
/// lowest-index vacant slot in place before growing the table, so indices are
/// reused, but only after the previous occupant was fully removed. The
/// number of live states ([`len`](Self::len)) is therefore independent of the
/// table's physical width ([`slot_count`](Self::slot_count)).
///
/// Every structural insert or remove bumps [`revision`](Self::revision),
/// which is what invalidates detached cursors captured against an older
/// table shape.
#[derive(Debug, Default)]
pub struct StateTable {
    slots: Vec<Option<AnimationState>>,
    live: usize,
    revision: u64,
}

impl StateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot and fills it with the state built by `build`, which
    /// receives the assigned index. Returns that index.
    pub(crate) fn insert(&mut self, build: impl FnOnce(usize) -> AnimationState) -> usize {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(vacant) => vacant,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[index] = Some(build(index));
        self.live += 1;
        self.revision += 1;
        index
    }

    /// Removes the state at `index` and returns it so the caller can tear
    /// down its graph node.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or already vacant; removing a slot
    /// twice is a caller bug and is never absorbed silently.
    pub(crate) fn remove(&mut self, index: usize) -> AnimationState {
        let Some(slot) = self.slots.get_mut(index) else {
            panic!("state table: slot {index} is out of bounds");
        };
        let Some(state) = slot.take() else {
            panic!("state table: slot {index} is already vacant");
        };
        self.live -= 1;
        self.revision += 1;
        state
    }

    /// Index of the first live state called `name`, in slot order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|state| state.name() == name))
    }

    /// True when at least one live state is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.iter().any(AnimationState::enabled)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AnimationState> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut AnimationState> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Live states in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &AnimationState> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AnimationState> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Number of live states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Physical width of the table, vacant slots included.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Indices of every live state sharing `clip`, by pointer identity.
    /// Clones share their original's clip, so they match too.
    pub(crate) fn indices_of_clip(&self, clip: &Arc<AnimationClip>) -> SmallVec<[usize; 4]> {
        self.iter()
            .filter(|state| Arc::ptr_eq(state.clip(), clip))
            .map(AnimationState::index)
            .collect()
    }
}
