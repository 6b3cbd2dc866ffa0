use std::sync::Arc;

use crate::clip::{AnimationClip, LoopMode};
use crate::graph::{MixerGraph, NodeId};

/// Absolute tolerance used when a fading weight is compared to its target.
pub(crate) const WEIGHT_EPSILON: f32 = 1e-5;

/// Per-slot playback bookkeeping.
///
/// A state owns no clip data: it references its clip through a shared `Arc`
/// and its playback node through a [`NodeId`]. Weight and enabled mutations
/// are deferred; they raise dirty flags that the mixer consumes exactly once
/// per tick, so the mixing graph is only touched from inside the tick (with
/// the single exception of [`set_time`](Self::set_time), which pushes
/// eagerly).
///
/// The user-facing `weight` is an unbounded non-negative magnitude; the value
/// pushed to the graph is the normalized share computed by the mixer each
/// tick.
#[derive(Debug)]
pub struct AnimationState {
    index: usize,
    name: String,
    clip: Arc<AnimationClip>,
    node: NodeId,

    weight: f32,
    target_weight: f32,
    fade_speed: f32,
    fading: bool,

    enabled: bool,
    enabled_dirty: bool,
    weight_dirty: bool,

    loop_mode: LoopMode,

    is_clone: bool,
    parent_slot: Option<usize>,
    ready_for_cleanup: bool,

    time: f32,
    time_is_fresh: bool,
}

impl AnimationState {
    pub(crate) fn new(
        index: usize,
        name: String,
        clip: Arc<AnimationClip>,
        node: NodeId,
    ) -> Self {
        let loop_mode = clip.loop_mode;
        Self {
            index,
            name,
            clip,
            node,
            weight: 0.0,
            target_weight: 0.0,
            fade_speed: 0.0,
            fading: false,
            enabled: false,
            enabled_dirty: false,
            weight_dirty: false,
            loop_mode,
            is_clone: false,
            parent_slot: None,
            ready_for_cleanup: false,
            time: 0.0,
            time_is_fresh: false,
        }
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Marks this state as a queued clone of the slot at `parent`.
    ///
    /// The parent reference is a lookup relation, never ownership: the parent
    /// may be removed later without affecting this clone's lifecycle.
    pub(crate) fn mark_clone_of(&mut self, parent: usize) {
        self.is_clone = true;
        self.parent_slot = Some(parent);
    }

    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.is_clone
    }

    #[must_use]
    pub fn parent_slot(&self) -> Option<usize> {
        self.parent_slot
    }

    #[must_use]
    pub fn ready_for_cleanup(&self) -> bool {
        self.ready_for_cleanup
    }

    // ------------------------------------------------------------------
    // Weight & fading
    // ------------------------------------------------------------------

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[must_use]
    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    #[must_use]
    pub fn fade_speed(&self) -> f32 {
        self.fade_speed
    }

    #[must_use]
    pub fn fading(&self) -> bool {
        self.fading
    }

    /// Sets the weight and raises the dirty flag. Fade parameters are left
    /// untouched; the tick keeps moving the weight afterwards if a fade is in
    /// flight.
    pub(crate) fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
        self.weight_dirty = true;
    }

    /// Sets the weight immediately and cancels any active fade.
    pub(crate) fn force_weight(&mut self, weight: f32) {
        self.target_weight = weight;
        self.fading = false;
        self.fade_speed = 0.0;
        self.set_weight(weight);
    }

    /// Starts fading toward `target` at `speed` weight units per second.
    pub(crate) fn fade_to(&mut self, target: f32, speed: f32) {
        self.fading = speed.abs() > 0.0;
        self.fade_speed = speed;
        self.target_weight = target;
    }

    /// Starts fading toward `target` over `duration` seconds.
    ///
    /// A zero duration fades at infinite speed, i.e. the weight snaps on the
    /// next tick. A new fade toward the *same* target at a *slower* rate than
    /// the fade already in flight is ignored, so repeated crossfade calls
    /// never decelerate a transition.
    pub(crate) fn begin_fade(&mut self, target: f32, duration: f32) {
        let travel = (self.weight - target).abs();
        let speed = if duration == 0.0 {
            f32::INFINITY
        } else {
            travel / duration
        };

        if self.fading && approximately(self.target_weight, target) && speed < self.fade_speed {
            return;
        }

        self.fade_to(target, speed);
    }

    // ------------------------------------------------------------------
    // Enabled flag
    // ------------------------------------------------------------------

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.enabled_dirty = true;
    }

    pub(crate) fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.enabled_dirty = true;
    }

    pub(crate) fn enabled_dirty(&self) -> bool {
        self.enabled_dirty
    }

    pub(crate) fn weight_dirty(&self) -> bool {
        self.weight_dirty
    }

    pub(crate) fn reset_dirty_flags(&mut self) {
        self.enabled_dirty = false;
        self.weight_dirty = false;
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Current clip time, fetched from the graph at most once per tick.
    pub(crate) fn time<G: MixerGraph>(&mut self, graph: &G) -> f32 {
        if !self.time_is_fresh {
            self.time = graph.time(self.node);
            self.time_is_fresh = true;
        }
        self.time
    }

    /// Read-only time access that bypasses the cache when it is stale.
    pub(crate) fn peek_time<G: MixerGraph>(&self, graph: &G) -> f32 {
        if self.time_is_fresh {
            self.time
        } else {
            graph.time(self.node)
        }
    }

    /// Pushes a new time to the node eagerly, marking it done when the time
    /// is at or past the node's duration.
    pub(crate) fn set_time<G: MixerGraph>(&mut self, graph: &mut G, time: f32) {
        self.time = time;
        self.time_is_fresh = true;
        graph.set_time(self.node, time);
        graph.set_done(self.node, time >= graph.duration(self.node));
    }

    pub(crate) fn invalidate_time(&mut self) {
        self.time_is_fresh = false;
    }

    // ------------------------------------------------------------------
    // Stopping
    // ------------------------------------------------------------------

    /// Stops playback: cancels the fade, zeroes the weight, disables the
    /// slot, rewinds the node, and clears its done flag.
    ///
    /// Clones are additionally flagged for the cleanup pass; non-clones
    /// persist disabled, keeping their name and slot for future replay.
    pub(crate) fn stop<G: MixerGraph>(&mut self, graph: &mut G) {
        self.force_weight(0.0);
        self.disable();
        self.set_time(graph, 0.0);
        graph.set_done(self.node, false);
        if self.is_clone {
            self.ready_for_cleanup = true;
        }
    }
}

/// Moves `current` toward `target` by at most `max_delta`, clamping at the
/// target without overshoot.
#[inline]
pub(crate) fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

#[inline]
pub(crate) fn approximately(a: f32, b: f32) -> bool {
    (a - b).abs() < WEIGHT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_towards_clamps_at_target() {
        assert_eq!(move_towards(0.0, 1.0, 0.25), 0.25);
        assert_eq!(move_towards(0.9, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(1.0, 0.0, 0.25), 0.75);
        assert_eq!(move_towards(0.1, 0.0, 0.25), 0.0);
    }

    #[test]
    fn move_towards_infinite_step_snaps() {
        assert_eq!(move_towards(0.0, 1.0, f32::INFINITY), 1.0);
    }

    #[test]
    fn begin_fade_ignores_slower_duplicate() {
        let clip = AnimationClip::looping("clip", 1.0);
        let mut state = AnimationState::new(0, "clip".into(), clip, NodeId::from_raw(0));

        state.begin_fade(1.0, 0.5);
        let fast = state.fade_speed();
        assert!(state.fading());

        // Same target, longer duration: the in-flight rate wins.
        state.begin_fade(1.0, 2.0);
        assert_eq!(state.fade_speed(), fast);

        // Different target: the new fade always takes over.
        state.begin_fade(0.25, 2.0);
        assert!(approximately(state.target_weight(), 0.25));
    }

    #[test]
    fn force_weight_cancels_fade() {
        let clip = AnimationClip::looping("clip", 1.0);
        let mut state = AnimationState::new(0, "clip".into(), clip, NodeId::from_raw(0));

        state.begin_fade(1.0, 0.5);
        state.force_weight(0.4);
        assert!(!state.fading());
        assert_eq!(state.fade_speed(), 0.0);
        assert_eq!(state.weight(), 0.4);
        assert_eq!(state.target_weight(), 0.4);
    }

    #[test]
    fn enable_disable_raise_dirty_once() {
        let clip = AnimationClip::looping("clip", 1.0);
        let mut state = AnimationState::new(0, "clip".into(), clip, NodeId::from_raw(0));

        state.enable();
        assert!(state.enabled() && state.enabled_dirty());
        state.reset_dirty_flags();

        // Enabling an already enabled state is a no-op.
        state.enable();
        assert!(!state.enabled_dirty());

        state.disable();
        assert!(!state.enabled() && state.enabled_dirty());
    }
}
