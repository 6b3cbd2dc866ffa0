//! The blending engine.
//!
//! [`AnimationMixer`] owns the state table, the transition queue, and the
//! mixing graph, and ties them together in [`update`](AnimationMixer::update):
//! the once-per-frame tick that promotes due queued transitions, advances
//! fades, renormalizes mixer input weights, detects one-shot completion, and
//! sweeps finished clones.
//!
//! All playback-control calls made between ticks only raise dirty flags on
//! the affected states; the graph itself is touched from inside the tick.

use std::sync::Arc;

use crate::clip::{AnimationClip, LoopMode};
use crate::errors::{AnimixError, Result};
use crate::graph::{MixerGraph, NodeId};
use crate::handle::{StateCursor, StateHandle, StateMut, StateRef};
use crate::queue::{QueueMode, TransitionQueue};
use crate::settings::MixerSettings;
use crate::state::{AnimationState, approximately, move_towards};
use crate::table::StateTable;

/// Callback fired once each time the last enabled state stops.
pub type DoneCallback = Box<dyn FnMut()>;

/// Blends registered animation states into a single weighted output.
///
/// The mixer owns its graph `G` exclusively: it creates one mixer node at
/// construction and one playback node per registered state, wired to the
/// mixer input matching the state's slot index.
///
/// Drive it once per frame with [`update`](Self::update).
pub struct AnimationMixer<G: MixerGraph> {
    pub(crate) graph: G,
    pub(crate) table: StateTable,
    queue: TransitionQueue,
    settings: MixerSettings,
    mixer: NodeId,
    pub(crate) done: bool,
    on_done: Option<DoneCallback>,
}

impl<G: MixerGraph> AnimationMixer<G> {
    #[must_use]
    pub fn new(graph: G) -> Self {
        Self::with_settings(graph, MixerSettings::default())
    }

    #[must_use]
    pub fn with_settings(mut graph: G, settings: MixerSettings) -> Self {
        let mixer = graph.create_mixer();
        Self {
            graph,
            table: StateTable::new(),
            queue: TransitionQueue::default(),
            settings,
            mixer,
            done: true,
            on_done: None,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers `clip` under `name` and returns a handle to the new state.
    ///
    /// The state starts disabled at weight zero; nothing plays until one of
    /// the playback controls enables it.
    pub fn add_clip(&mut self, clip: Arc<AnimationClip>, name: impl Into<String>) -> Result<StateHandle> {
        let name = name.into();
        if self.table.find_by_name(&name).is_some() {
            return Err(AnimixError::DuplicateName(name));
        }
        let handle = self.add_state(name, clip, None);
        log::debug!("added animation state at slot {}", handle.index());
        Ok(handle)
    }

    /// Removes the state called `name`, destroying its graph node. Queued
    /// clones of that state are stopped and unqueued first.
    pub fn remove_clip(&mut self, name: &str) -> Result<()> {
        let index = self.state_named(name)?.index();
        log::debug!("removing animation state `{name}` (slot {index})");
        self.queue.drop_slot(index);
        self.purge_queued_clones(index);
        self.remove_slot(index);
        Ok(())
    }

    /// Removes every state sharing `clip` (clones included), dropping their
    /// queue entries. Returns whether anything was removed.
    pub fn remove_clip_states(&mut self, clip: &Arc<AnimationClip>) -> bool {
        let indices = self.table.indices_of_clip(clip);
        for &index in &indices {
            self.queue.drop_slot(index);
            self.remove_slot(index);
        }
        !indices.is_empty()
    }

    // ------------------------------------------------------------------
    // Playback control
    // ------------------------------------------------------------------

    /// Plays `name` exclusively: its weight is forced to `1` and every other
    /// state is stopped.
    pub fn play(&mut self, name: &str) -> Result<()> {
        let index = self.state_named(name)?.index();
        self.do_play(index);
        Ok(())
    }

    /// Fades `name` in to weight `1` over `duration` seconds while every
    /// other enabled state fades out to `0`.
    ///
    /// A zero duration degenerates to an exclusive [`play`](Self::play).
    pub fn crossfade(&mut self, name: &str, duration: f32) -> Result<()> {
        let index = self.state_named(name)?.index();
        if duration == 0.0 {
            self.do_play(index);
        } else {
            self.do_crossfade(index, duration);
        }
        Ok(())
    }

    /// Fades only `name` toward `target_weight` over `duration` seconds,
    /// leaving every other state untouched. Enables the state if needed.
    ///
    /// Unlike [`crossfade`](Self::crossfade) this is non-exclusive, which is
    /// what makes additive blends (and target weights above `1`) possible.
    pub fn blend(&mut self, name: &str, target_weight: f32, duration: f32) -> Result<()> {
        if target_weight < 0.0 {
            return Err(AnimixError::InvalidArgument(format!(
                "blend target weight must be non-negative, got {target_weight}"
            )));
        }
        let index = self.state_named(name)?.index();
        self.done = false;
        if let Some(state) = self.table.get_mut(index) {
            state.enable();
            if duration == 0.0 {
                state.force_weight(target_weight);
            } else {
                state.begin_fade(target_weight, duration);
            }
        }
        Ok(())
    }

    /// Stops the state called `name`.
    ///
    /// A non-clone keeps its slot, disabled at weight zero, ready for future
    /// replay; its queued clones are stopped and unqueued. A clone is flagged
    /// for removal by the next tick's cleanup pass.
    pub fn stop(&mut self, name: &str) -> Result<()> {
        let index = self.state_named(name)?.index();
        self.do_stop(index);
        self.update_done_status();
        Ok(())
    }

    /// Stops every state, clears the transition queue, and latches the done
    /// flag without firing the done callback.
    pub fn stop_all(&mut self) {
        log::debug!("stopping every animation state");
        self.clear_queue();
        for index in 0..self.table.slot_count() {
            self.do_stop(index);
        }
        self.done = true;
    }

    /// Resets the named state's time to `0` without touching its enabled
    /// flag or weight.
    pub fn rewind(&mut self, name: &str) -> Result<()> {
        let index = self.state_named(name)?.index();
        let Self { graph, table, .. } = self;
        if let Some(state) = table.get_mut(index) {
            state.set_time(graph, 0.0);
        }
        Ok(())
    }

    /// Resets every state's time to `0`.
    pub fn rewind_all(&mut self) {
        let Self { graph, table, .. } = self;
        for state in table.iter_mut() {
            state.set_time(graph, 0.0);
        }
    }

    // ------------------------------------------------------------------
    // Queueing
    // ------------------------------------------------------------------

    /// Queues an exclusive play of a clone of `name`, to begin once every
    /// currently playing state is about to run out.
    ///
    /// Returns a handle to the clone; it is cleaned up automatically after
    /// it stops.
    pub fn play_queued(&mut self, name: &str, mode: QueueMode) -> Result<StateHandle> {
        let handle = self.clone_named(name)?;
        match mode {
            QueueMode::PlayNow => self.do_play(handle.index()),
            QueueMode::CompleteOthers => self.queue.push(handle.index(), 0.0),
        }
        Ok(handle)
    }

    /// Queues a crossfade into a clone of `name` over `duration` seconds,
    /// promoted once the longest remaining play time falls to or below
    /// `duration`.
    pub fn crossfade_queued(
        &mut self,
        name: &str,
        duration: f32,
        mode: QueueMode,
    ) -> Result<StateHandle> {
        let handle = self.clone_named(name)?;
        match mode {
            QueueMode::PlayNow => self.do_crossfade(handle.index(), duration),
            QueueMode::CompleteOthers => self.queue.push(handle.index(), duration),
        }
        Ok(handle)
    }

    /// Number of transitions still waiting in the queue.
    #[must_use]
    pub fn pending_transitions(&self) -> usize {
        self.queue.len()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// True when at least one state is enabled.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.table.any_enabled()
    }

    /// True when the state called `name` is enabled, or any enabled clone of
    /// it exists. Returns `false` for unknown names.
    #[must_use]
    pub fn is_playing_state(&self, name: &str) -> bool {
        match self.table.iter().find(|state| state.name() == name) {
            Some(state) => state.enabled() || self.any_clone_playing(state.index()),
            None => false,
        }
    }

    /// Number of live states, clones included.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    /// True once nothing is enabled anymore. Latches until the next playback
    /// control enables a state, and starts latched on a fresh mixer.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Registers the callback fired when the last enabled state stops.
    ///
    /// The callback fires exactly once per transition into idleness, from
    /// inside [`update`](Self::update) or [`stop`](Self::stop), and never again
    /// while the mixer stays idle. [`stop_all`](Self::stop_all) latches the
    /// done flag without firing it.
    pub fn set_on_done(&mut self, callback: impl FnMut() + 'static) {
        self.on_done = Some(Box::new(callback));
    }

    pub fn clear_on_done(&mut self) {
        self.on_done = None;
    }

    /// Read-only view of the state table.
    #[must_use]
    pub fn table(&self) -> &StateTable {
        &self.table
    }

    #[must_use]
    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// The mixer node every state's playback node feeds into.
    #[must_use]
    pub fn mixer_node(&self) -> NodeId {
        self.mixer
    }

    #[must_use]
    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Changes the stopped-node connection policy at runtime, immediately
    /// reconciling the connection of every disabled state.
    pub fn set_keep_stopped_nodes_connected(&mut self, keep: bool) {
        if self.settings.keep_stopped_nodes_connected == keep {
            return;
        }
        self.settings.keep_stopped_nodes_connected = keep;
        self.reconcile_stopped_connections();
    }

    // ------------------------------------------------------------------
    // Handles & cursors
    // ------------------------------------------------------------------

    /// Handle to the state called `name`, if any.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<StateHandle> {
        self.table
            .iter()
            .find(|state| state.name() == name)
            .map(StateHandle::for_state)
    }

    /// True while `handle` still refers to the state it was captured from.
    ///
    /// Slot indices are reused after removal, so validation also pins the
    /// node identity, which never is.
    #[must_use]
    pub fn is_valid(&self, handle: StateHandle) -> bool {
        self.table
            .get(handle.index())
            .is_some_and(|state| state.node() == handle.node())
    }

    /// Read guard for the state behind `handle`.
    pub fn state(&self, handle: StateHandle) -> Result<StateRef<'_, G>> {
        match self.table.get(handle.index()) {
            Some(state) if state.node() == handle.node() => {
                Ok(StateRef::new(state, &self.graph))
            }
            _ => Err(AnimixError::InvalidHandle),
        }
    }

    /// Write guard for the state behind `handle`.
    ///
    /// The guard exclusively borrows the mixer, so no structural change can
    /// interleave with its use.
    pub fn state_mut(&mut self, handle: StateHandle) -> Result<StateMut<'_, G>> {
        let Self {
            graph, table, done, ..
        } = self;
        match table.get_mut(handle.index()) {
            Some(state) if state.node() == handle.node() => {
                Ok(StateMut::new(state, graph, done))
            }
            _ => Err(AnimixError::InvalidHandle),
        }
    }

    /// Detached cursor over the live states, invalidated by any structural
    /// change to the table.
    #[must_use]
    pub fn states(&self) -> StateCursor {
        StateCursor::new(self.table.revision())
    }

    // ------------------------------------------------------------------
    // The tick
    // ------------------------------------------------------------------

    /// Advances the mixer by `dt` seconds of animation time.
    ///
    /// Must be called exactly once per frame by the owning scheduler. The
    /// pipeline order is fixed: invalidate cached times, promote due queued
    /// transitions, advance fades and resolve deferred flags, renormalize
    /// weights, update the done status, then sweep finished clones.
    pub fn update(&mut self, dt: f32) {
        if dt < 0.0 {
            log::warn!("animation tick with negative dt ({dt}); fades will move away from their targets");
        }

        for state in self.table.iter_mut() {
            state.invalidate_time();
        }

        self.promote_due_transitions();
        self.resolve_states(dt);
        self.update_done_status();
        self.sweep_finished_clones();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn state_named(&self, name: &str) -> Result<&AnimationState> {
        self.table
            .iter()
            .find(|state| state.name() == name)
            .ok_or_else(|| AnimixError::NameNotFound(name.to_owned()))
    }

    /// Creates a node for `clip` and installs a state wrapping it in the
    /// lowest vacant slot.
    fn add_state(&mut self, name: String, clip: Arc<AnimationClip>, parent: Option<usize>) -> StateHandle {
        let node = self.graph.create_node(&clip);
        let index = self.table.insert(|index| {
            let mut state = AnimationState::new(index, name, clip, node);
            if let Some(parent) = parent {
                state.mark_clone_of(parent);
            }
            state
        });
        if self.settings.keep_stopped_nodes_connected {
            self.graph.connect(self.mixer, index, node);
        }
        StateHandle::new(index, node)
    }

    /// Clones the state called `name` for queued playback. The clone shares
    /// the original's clip and remembers its slot as a weak back-reference.
    fn clone_named(&mut self, name: &str) -> Result<StateHandle> {
        let source = self.state_named(name)?;
        let parent = source.index();
        let clip = Arc::clone(source.clip());
        let clone_name = format!("{} (queued)", source.name());
        Ok(self.add_state(clone_name, clip, Some(parent)))
    }

    /// Tears down the slot at `index`: disconnects its mixer input, scrubs
    /// the input weight, and destroys its node.
    fn remove_slot(&mut self, index: usize) {
        let state = self.table.remove(index);
        self.graph.disconnect(self.mixer, index);
        self.graph.set_input_weight(self.mixer, index, 0.0);
        self.graph.destroy_node(state.node());
    }

    fn do_play(&mut self, target: usize) {
        self.done = false;
        for index in 0..self.table.slot_count() {
            if index == target {
                if let Some(state) = self.table.get_mut(index) {
                    state.enable();
                    state.force_weight(1.0);
                }
            } else {
                self.do_stop(index);
            }
        }
    }

    /// Fades `target` in and every other enabled state out.
    ///
    /// Unlike the public entry point this does not degenerate to `do_play`
    /// at zero duration: queue promotion of a zero-fade entry relies on an
    /// infinite-speed fade instead.
    fn do_crossfade(&mut self, target: usize, duration: f32) {
        self.done = false;
        for index in 0..self.table.slot_count() {
            let Some(state) = self.table.get_mut(index) else {
                continue;
            };
            if index == target {
                state.enable();
            }
            if !state.enabled() {
                continue;
            }
            let target_weight = if index == target { 1.0 } else { 0.0 };
            state.begin_fade(target_weight, duration);
        }
    }

    /// Stops the slot at `index`, tolerating vacancy. Clones lose their
    /// queue entry; non-clones get their queued clones purged.
    fn do_stop(&mut self, index: usize) {
        let Self { graph, table, queue, .. } = self;
        let Some(state) = table.get_mut(index) else {
            return;
        };
        state.stop(graph);
        if state.is_clone() {
            queue.drop_slot(index);
        } else {
            self.purge_queued_clones(index);
        }
    }

    /// Stops and unqueues every queued clone descended from `parent`.
    fn purge_queued_clones(&mut self, parent: usize) {
        let table = &self.table;
        let dropped = self.queue.drain_matching(|slot| {
            table
                .get(slot)
                .is_some_and(|state| state.parent_slot() == Some(parent))
        });
        for slot in dropped {
            if let Some(state) = self.table.get_mut(slot) {
                state.stop(&mut self.graph);
            }
        }
    }

    /// Stops every queued clone and empties the queue.
    fn clear_queue(&mut self) {
        for slot in self.queue.take_all() {
            if let Some(state) = self.table.get_mut(slot) {
                state.stop(&mut self.graph);
            }
        }
    }

    fn any_clone_playing(&self, parent: usize) -> bool {
        self.table.iter().any(|state| {
            state.is_clone() && state.enabled() && state.parent_slot() == Some(parent)
        })
    }

    /// Promotes queue entries whose fade duration covers the longest
    /// remaining play time, re-evaluating after each promotion.
    fn promote_due_transitions(&mut self) {
        while let Some(entry) = self.queue.front() {
            let remaining = self.longest_remaining_time();
            if entry.fade < remaining {
                break;
            }
            log::trace!(
                "promoting queued state at slot {} (fade {}s covers remaining {}s)",
                entry.slot,
                entry.fade,
                remaining
            );
            self.queue.pop_front();
            self.do_crossfade(entry.slot, entry.fade);
        }
    }

    /// Longest remaining play time across enabled states.
    ///
    /// Infinite as soon as any enabled state loops or has zero speed; `-1`
    /// when nothing qualifies, so a pending transition fires immediately on
    /// an idle mixer.
    fn longest_remaining_time(&mut self) -> f32 {
        let Self { graph, table, .. } = self;
        let mut longest = -1.0_f32;
        for state in table.iter_mut() {
            if !state.enabled() {
                continue;
            }
            if state.loop_mode() == LoopMode::Loop {
                return f32::INFINITY;
            }
            let speed = graph.speed(state.node());
            let time = state.time(graph);
            let remaining = if speed > 0.0 {
                (state.clip().duration - time) / speed
            } else if speed < 0.0 {
                // Time left to reach zero playing backward.
                (0.0 - time) / speed
            } else {
                f32::INFINITY
            };
            longest = longest.max(remaining);
        }
        longest
    }

    /// Advances fades, consumes dirty flags, detects one-shot completion,
    /// and renormalizes mixer input weights.
    fn resolve_states(&mut self, dt: f32) {
        let Self {
            graph,
            table,
            queue,
            settings,
            mixer,
            ..
        } = self;
        let mixer = *mixer;

        let mut weights_dirty = false;
        let mut total_weight = 0.0_f32;

        for index in 0..table.slot_count() {
            let Some(state) = table.get_mut(index) else {
                continue;
            };

            if state.fading() {
                // A zero-duration fade carries infinite speed; with dt == 0
                // the step would come out NaN.
                let mut step = state.fade_speed() * dt;
                if step.is_nan() {
                    step = f32::INFINITY;
                }
                state.set_weight(move_towards(state.weight(), state.target_weight(), step));
                if approximately(state.weight(), state.target_weight()) {
                    state.force_weight(state.target_weight());
                    if state.weight() == 0.0 {
                        state.stop(graph);
                        if state.is_clone() {
                            queue.drop_slot(index);
                        }
                    }
                }
            }

            if state.enabled_dirty() {
                if state.enabled() {
                    graph.play(state.node());
                } else {
                    graph.pause(state.node());
                }
                if !settings.keep_stopped_nodes_connected {
                    let connected = graph.input(mixer, index).is_some();
                    if state.enabled() && !connected {
                        graph.connect(mixer, index, state.node());
                    } else if !state.enabled() && connected {
                        graph.disconnect(mixer, index);
                    }
                }
            }

            // One-shot completion: a play-once state is finished when its
            // node reports done, or its clock ran past either end.
            if state.enabled() && state.loop_mode() == LoopMode::Once {
                let node = state.node();
                let speed = graph.speed(node);
                let time = state.time(graph);
                let duration = graph.duration(node);
                let finished = graph.is_done(node)
                    || (speed < 0.0 && time < 0.0)
                    || (speed >= 0.0 && time >= duration);
                if finished {
                    state.stop(graph);
                    if state.is_clone() {
                        queue.drop_slot(index);
                    }
                    if !settings.keep_stopped_nodes_connected {
                        graph.disconnect(mixer, index);
                    }
                }
            }

            if state.enabled() {
                total_weight += state.weight();
            }
            if state.weight_dirty() {
                weights_dirty = true;
            }
            state.reset_dirty_flags();
        }

        // Renormalize: the pushed input weight is the state's share of the
        // total, so enabled contributions always sum to 1 (or all push 0).
        if weights_dirty {
            let has_any_weight = total_weight > 0.0;
            for index in 0..table.slot_count() {
                let Some(state) = table.get(index) else {
                    continue;
                };
                let normalized = if has_any_weight && state.enabled() {
                    state.weight() / total_weight
                } else {
                    0.0
                };
                graph.set_input_weight(mixer, index, normalized);
            }
        }
    }

    /// Latches the done flag on the edge transition into idleness, firing
    /// the callback exactly once.
    fn update_done_status(&mut self) {
        if !self.table.any_enabled() {
            let was_done = self.done;
            self.done = true;
            if !was_done {
                log::debug!("mixer idle: every state stopped");
                if let Some(callback) = self.on_done.as_mut() {
                    callback();
                }
            }
        }
    }

    /// Removes every clone flagged by a stop since the last sweep, freeing
    /// its slot index for reuse.
    fn sweep_finished_clones(&mut self) {
        for index in (0..self.table.slot_count()).rev() {
            let ready = self
                .table
                .get(index)
                .is_some_and(AnimationState::ready_for_cleanup);
            if ready {
                log::trace!("sweeping finished clone at slot {index}");
                self.remove_slot(index);
            }
        }
    }

    /// Applies the current connection policy to every disabled state.
    fn reconcile_stopped_connections(&mut self) {
        let Self {
            graph,
            table,
            settings,
            mixer,
            ..
        } = self;
        let mixer = *mixer;
        for state in table.iter() {
            if state.enabled() {
                continue;
            }
            if settings.keep_stopped_nodes_connected {
                graph.connect(mixer, state.index(), state.node());
            } else {
                graph.disconnect(mixer, state.index());
            }
        }
    }
}
