//! The mixing-graph seam.
//!
//! The mixer does not decode clips or evaluate poses. It drives an external
//! directed acyclic graph of playback nodes through the [`MixerGraph`] trait:
//! one clip node per animation state, all feeding the weighted inputs of a
//! single mixer node. Everything the blending engine does ends up as calls on
//! this trait: create/destroy, connect/disconnect, play/pause, clock reads
//! and writes, and normalized input weights.
//!
//! A deterministic in-memory implementation, [`LocalGraph`](crate::LocalGraph),
//! ships with the crate for tests, benches, and examples.

use std::sync::Arc;

use crate::clip::AnimationClip;

/// Opaque identity of a node inside a [`MixerGraph`].
///
/// Ids are minted by the graph and must never be reused, even after the node
/// is destroyed. Slot indices in the state table *are* reused, so a freshly
/// minted id is what lets a stale [`StateHandle`](crate::StateHandle) be told
/// apart from a live slot that happens to occupy the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw id. Only graph implementations should mint these.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Contract between the blending engine and the underlying playback graph.
///
/// All operations are synchronous and side-effect-free beyond the node they
/// target. The engine guarantees it only passes ids it obtained from the same
/// graph instance and has not destroyed yet.
///
/// # Node clocks
///
/// A clip node carries a clock (`time`), a signed playback-rate multiplier
/// (`speed`), a paused/playing flag, and a latching `done` flag. Creation
/// seeds time `0`, speed `1`, paused. [`duration`](Self::duration) reports the
/// clip length for play-once clips and infinity for looping clips; a looping
/// node never runs out on its own.
pub trait MixerGraph {
    /// Creates a playback node wrapping `clip`.
    fn create_node(&mut self, clip: &Arc<AnimationClip>) -> NodeId;

    /// Creates a mixer node with growable weighted inputs.
    fn create_mixer(&mut self) -> NodeId;

    /// Destroys a node, releasing its resources and detaching it from any
    /// mixer input it still feeds.
    fn destroy_node(&mut self, node: NodeId);

    /// Connects `node` to input slot `input` of `mixer`.
    fn connect(&mut self, mixer: NodeId, input: usize, node: NodeId);

    /// Disconnects input slot `input` of `mixer`. The slot's weight is kept.
    fn disconnect(&mut self, mixer: NodeId, input: usize);

    /// Sets the normalized contribution of input slot `input`, in `[0, 1]`.
    fn set_input_weight(&mut self, mixer: NodeId, input: usize, weight: f32);

    /// Node currently connected to input slot `input`, if any.
    fn input(&self, mixer: NodeId, input: usize) -> Option<NodeId>;

    /// Last weight pushed to input slot `input` (`0.0` if never set).
    fn input_weight(&self, mixer: NodeId, input: usize) -> f32;

    fn play(&mut self, node: NodeId);

    fn pause(&mut self, node: NodeId);

    fn time(&self, node: NodeId) -> f32;

    fn set_time(&mut self, node: NodeId, time: f32);

    fn speed(&self, node: NodeId) -> f32;

    fn set_speed(&mut self, node: NodeId, speed: f32);

    fn is_done(&self, node: NodeId) -> bool;

    fn set_done(&mut self, node: NodeId, done: bool);

    /// Clip length for play-once nodes, `f32::INFINITY` for looping nodes.
    fn duration(&self, node: NodeId) -> f32;
}
