//! Validated access to individual animation states.
//!
//! By-name calls on the mixer are convenient but rescan the table; handles
//! capture a state once and reach it in constant time afterwards. Because
//! slot indices are reused after removal, a [`StateHandle`] also pins the
//! state's graph node identity, which the graph never reuses, so a stale
//! handle fails with [`InvalidHandle`](crate::AnimixError::InvalidHandle)
//! instead of silently aliasing whatever state occupies the slot today.
//!
//! [`StateRef`] and [`StateMut`] are the access guards behind
//! [`state`](crate::AnimationMixer::state) and
//! [`state_mut`](crate::AnimationMixer::state_mut): short-lived views that
//! borrow the mixer, combining the state's bookkeeping with the graph-side
//! values (time, speed) it does not store itself.
//!
//! [`StateCursor`] enumerates live states without borrowing the mixer across
//! iterations. It is revision-checked: any structural change to the table
//! (insert, remove, clone sweep) invalidates it.

use std::sync::Arc;

use crate::clip::{AnimationClip, LoopMode};
use crate::errors::{AnimixError, Result};
use crate::graph::{MixerGraph, NodeId};
use crate::mixer::AnimationMixer;
use crate::state::AnimationState;

/// Stable reference to an animation state: its slot index plus the node
/// identity pinning which occupant of that slot it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHandle {
    index: usize,
    node: NodeId,
}

impl StateHandle {
    pub(crate) fn new(index: usize, node: NodeId) -> Self {
        Self { index, node }
    }

    pub(crate) fn for_state(state: &AnimationState) -> Self {
        Self::new(state.index(), state.node())
    }

    /// Slot index in the state table. Reused after the state is removed.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }

    /// Graph node identity. Never reused.
    #[must_use]
    pub fn node(self) -> NodeId {
        self.node
    }
}

/// Detached iterator over live states, in slot order.
///
/// Captured against a table revision; every call to
/// [`next`](StateCursor::next) re-checks it, so enumeration started before a
/// structural change fails instead of observing a half-updated table shape.
#[derive(Debug)]
pub struct StateCursor {
    revision: u64,
    position: usize,
}

impl StateCursor {
    pub(crate) fn new(revision: u64) -> Self {
        Self {
            revision,
            position: 0,
        }
    }

    /// Handle to the next live state, `None` once exhausted.
    ///
    /// Fails with [`InvalidHandle`](AnimixError::InvalidHandle) if the table
    /// structurally changed since the cursor was created. Playback mutations
    /// (play, fades, weight changes) do not invalidate it.
    pub fn next<G: MixerGraph>(&mut self, mixer: &AnimationMixer<G>) -> Result<Option<StateHandle>> {
        if mixer.table.revision() != self.revision {
            return Err(AnimixError::InvalidHandle);
        }
        while self.position < mixer.table.slot_count() {
            let index = self.position;
            self.position += 1;
            if let Some(state) = mixer.table.get(index) {
                return Ok(Some(StateHandle::for_state(state)));
            }
        }
        Ok(None)
    }
}

/// Read guard over one animation state and the graph values backing it.
#[derive(Debug)]
pub struct StateRef<'a, G: MixerGraph> {
    state: &'a AnimationState,
    graph: &'a G,
}

impl<'a, G: MixerGraph> StateRef<'a, G> {
    pub(crate) fn new(state: &'a AnimationState, graph: &'a G) -> Self {
        Self { state, graph }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.state.name()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.state.index()
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.state.enabled()
    }

    /// The user-facing weight: an unbounded non-negative magnitude, not the
    /// normalized share pushed to the graph.
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.state.weight()
    }

    /// Current clip time in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.state.peek_time(self.graph)
    }

    /// Clip time as a fraction of the clip length. A zero-length clip
    /// normalizes against one second to keep the division meaningful.
    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        self.state.peek_time(self.graph) / effective_clip_length(self.state)
    }

    /// Signed playback-rate multiplier of the state's node.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.graph.speed(self.state.node())
    }

    /// Wall-clock seconds one playthrough takes at the current speed.
    ///
    /// Negative when playing backward, infinite at zero speed.
    #[must_use]
    pub fn length(&self) -> f32 {
        state_length(self.state, self.graph)
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        self.state.clip()
    }

    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        self.state.loop_mode()
    }

    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.state.is_clone()
    }
}

/// Write guard over one animation state.
///
/// Exclusively borrows the mixer, so no structural change can interleave
/// with its use. Weight and enabled writes go through the same deferred
/// dirty-flag path as the by-name controls; time and speed push eagerly.
#[derive(Debug)]
pub struct StateMut<'a, G: MixerGraph> {
    state: &'a mut AnimationState,
    graph: &'a mut G,
    done: &'a mut bool,
}

impl<'a, G: MixerGraph> StateMut<'a, G> {
    pub(crate) fn new(state: &'a mut AnimationState, graph: &'a mut G, done: &'a mut bool) -> Self {
        Self { state, graph, done }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.state.name()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.state.index()
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.state.enabled()
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.state.weight()
    }

    #[must_use]
    pub fn time(&self) -> f32 {
        self.state.peek_time(self.graph)
    }

    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        self.state.peek_time(self.graph) / effective_clip_length(self.state)
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.graph.speed(self.state.node())
    }

    #[must_use]
    pub fn length(&self) -> f32 {
        state_length(self.state, self.graph)
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        self.state.clip()
    }

    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        self.state.loop_mode()
    }

    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.state.is_clone()
    }

    /// Enables or disables the state without touching its weight.
    ///
    /// Enabling announces the intent to play, which re-arms the mixer's done
    /// notification. Disabling pauses the node on the next tick but, unlike
    /// stopping, keeps weight and time where they are.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.state.enable();
            *self.done = false;
        } else {
            self.state.disable();
        }
    }

    /// Seeks the clip to `time` seconds, effective immediately rather than
    /// on the next tick.
    pub fn set_time(&mut self, time: f32) {
        self.state.set_time(self.graph, time);
    }

    /// Seeks by fraction of the clip length; see
    /// [`normalized_time`](Self::normalized_time) for the zero-length rule.
    pub fn set_normalized_time(&mut self, normalized: f32) {
        let time = normalized * effective_clip_length(self.state);
        self.state.set_time(self.graph, time);
    }

    /// Sets the node's signed playback-rate multiplier.
    pub fn set_speed(&mut self, speed: f32) {
        self.graph.set_speed(self.state.node(), speed);
    }

    /// Sets the state's weight, rejecting negative values.
    ///
    /// The new value reaches the graph with the next tick's normalization
    /// pass. An active fade keeps running from the new value.
    pub fn set_weight(&mut self, weight: f32) -> Result<()> {
        if weight < 0.0 {
            return Err(AnimixError::InvalidArgument(format!(
                "state weight must be non-negative, got {weight}"
            )));
        }
        self.state.set_weight(weight);
        Ok(())
    }

    /// Renames the state, rejecting empty names. Clones keep their own
    /// names; renaming an original does not touch them.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(AnimixError::InvalidArgument(
                "state name must not be empty".into(),
            ));
        }
        self.state.set_name(name);
        Ok(())
    }
}

/// Clip length with zero-length clips treated as one second, so normalized
/// time never divides by zero.
fn effective_clip_length(state: &AnimationState) -> f32 {
    let length = state.clip().duration;
    if length == 0.0 { 1.0 } else { length }
}

/// Wall-clock length of one playthrough at the node's current speed.
fn state_length<G: MixerGraph>(state: &AnimationState, graph: &G) -> f32 {
    let speed = graph.speed(state.node());
    if speed == 0.0 {
        f32::INFINITY
    } else {
        state.clip().duration / speed
    }
}
