//! A deterministic in-memory [`MixerGraph`].
//!
//! [`LocalGraph`] implements the full graph contract without touching any
//! platform playback machinery: clip nodes are plain clock records and mixer
//! nodes are growable weighted input lists. It performs no sampling: calling
//! [`step`](LocalGraph::step) only advances the clock of every playing node.
//!
//! Drive it alongside the mixer, once per frame:
//!
//! ```rust,ignore
//! mixer.update(dt);            // bookkeeping reads last frame's clocks
//! mixer.graph_mut().step(dt);  // then the graph advances by dt
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::clip::{AnimationClip, LoopMode};
use crate::graph::{MixerGraph, NodeId};

#[derive(Debug)]
struct ClipNode {
    time: f32,
    speed: f32,
    playing: bool,
    done: bool,
    /// Clip length for play-once clips, infinity for looping clips.
    duration: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct MixerInput {
    source: Option<NodeId>,
    weight: f32,
}

#[derive(Debug)]
enum GraphNode {
    Clip(ClipNode),
    Mixer(Vec<MixerInput>),
}

/// In-memory playback graph with monotonically minted node ids.
///
/// Ids are never reused, which is exactly the identity property that lets
/// [`StateHandle`](crate::StateHandle) validation distinguish a reused slot
/// index from the slot it was captured against.
#[derive(Debug, Default)]
pub struct LocalGraph {
    nodes: FxHashMap<u64, GraphNode>,
    next_id: u64,
}

impl LocalGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock of every playing clip node by `dt * speed`.
    ///
    /// A node with a finite duration latches its `done` flag once its clock
    /// reaches that duration.
    pub fn step(&mut self, dt: f32) {
        for node in self.nodes.values_mut() {
            if let GraphNode::Clip(clip) = node {
                if clip.playing {
                    clip.time += dt * clip.speed;
                    if clip.time >= clip.duration {
                        clip.done = true;
                    }
                }
            }
        }
    }

    /// Number of live nodes, mixers included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn mint(&mut self, node: GraphNode) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        NodeId::from_raw(id)
    }

    #[track_caller]
    fn clip(&self, node: NodeId) -> &ClipNode {
        match self.nodes.get(&node.raw()) {
            Some(GraphNode::Clip(clip)) => clip,
            Some(GraphNode::Mixer(_)) => panic!("node {node:?} is a mixer, not a clip node"),
            None => panic!("unknown node {node:?}"),
        }
    }

    #[track_caller]
    fn clip_mut(&mut self, node: NodeId) -> &mut ClipNode {
        match self.nodes.get_mut(&node.raw()) {
            Some(GraphNode::Clip(clip)) => clip,
            Some(GraphNode::Mixer(_)) => panic!("node {node:?} is a mixer, not a clip node"),
            None => panic!("unknown node {node:?}"),
        }
    }

    #[track_caller]
    fn inputs_mut(&mut self, mixer: NodeId) -> &mut Vec<MixerInput> {
        match self.nodes.get_mut(&mixer.raw()) {
            Some(GraphNode::Mixer(inputs)) => inputs,
            Some(GraphNode::Clip(_)) => panic!("node {mixer:?} is a clip node, not a mixer"),
            None => panic!("unknown node {mixer:?}"),
        }
    }

    fn inputs(&self, mixer: NodeId) -> &[MixerInput] {
        match self.nodes.get(&mixer.raw()) {
            Some(GraphNode::Mixer(inputs)) => inputs,
            _ => &[],
        }
    }

    fn input_at(inputs: &mut Vec<MixerInput>, index: usize) -> &mut MixerInput {
        if index >= inputs.len() {
            inputs.resize_with(index + 1, MixerInput::default);
        }
        &mut inputs[index]
    }
}

impl MixerGraph for LocalGraph {
    fn create_node(&mut self, clip: &Arc<AnimationClip>) -> NodeId {
        let duration = match clip.loop_mode {
            LoopMode::Once => clip.duration,
            LoopMode::Loop => f32::INFINITY,
        };
        self.mint(GraphNode::Clip(ClipNode {
            time: 0.0,
            speed: 1.0,
            playing: false,
            done: false,
            duration,
        }))
    }

    fn create_mixer(&mut self) -> NodeId {
        self.mint(GraphNode::Mixer(Vec::new()))
    }

    fn destroy_node(&mut self, node: NodeId) {
        self.nodes.remove(&node.raw());
        // Scrub dangling references from every mixer input.
        for other in self.nodes.values_mut() {
            if let GraphNode::Mixer(inputs) = other {
                for input in inputs.iter_mut() {
                    if input.source == Some(node) {
                        input.source = None;
                    }
                }
            }
        }
    }

    fn connect(&mut self, mixer: NodeId, input: usize, node: NodeId) {
        Self::input_at(self.inputs_mut(mixer), input).source = Some(node);
    }

    fn disconnect(&mut self, mixer: NodeId, input: usize) {
        if let Some(slot) = self.inputs_mut(mixer).get_mut(input) {
            slot.source = None;
        }
    }

    fn set_input_weight(&mut self, mixer: NodeId, input: usize, weight: f32) {
        Self::input_at(self.inputs_mut(mixer), input).weight = weight;
    }

    fn input(&self, mixer: NodeId, input: usize) -> Option<NodeId> {
        self.inputs(mixer).get(input).and_then(|slot| slot.source)
    }

    fn input_weight(&self, mixer: NodeId, input: usize) -> f32 {
        self.inputs(mixer).get(input).map_or(0.0, |slot| slot.weight)
    }

    fn play(&mut self, node: NodeId) {
        self.clip_mut(node).playing = true;
    }

    fn pause(&mut self, node: NodeId) {
        self.clip_mut(node).playing = false;
    }

    fn time(&self, node: NodeId) -> f32 {
        self.clip(node).time
    }

    fn set_time(&mut self, node: NodeId, time: f32) {
        self.clip_mut(node).time = time;
    }

    fn speed(&self, node: NodeId) -> f32 {
        self.clip(node).speed
    }

    fn set_speed(&mut self, node: NodeId, speed: f32) {
        self.clip_mut(node).speed = speed;
    }

    fn is_done(&self, node: NodeId) -> bool {
        self.clip(node).done
    }

    fn set_done(&mut self, node: NodeId, done: bool) {
        self.clip_mut(node).done = done;
    }

    fn duration(&self, node: NodeId) -> f32 {
        self.clip(node).duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_once_clip(duration: f32) -> (LocalGraph, NodeId) {
        let mut graph = LocalGraph::new();
        let clip = AnimationClip::once("clip", duration);
        let node = graph.create_node(&clip);
        (graph, node)
    }

    #[test]
    fn new_nodes_start_paused_at_zero() {
        let (graph, node) = graph_with_once_clip(2.0);
        assert_eq!(graph.time(node), 0.0);
        assert_eq!(graph.speed(node), 1.0);
        assert!(!graph.is_done(node));
    }

    #[test]
    fn step_only_advances_playing_nodes() {
        let (mut graph, node) = graph_with_once_clip(2.0);
        graph.step(0.5);
        assert_eq!(graph.time(node), 0.0);

        graph.play(node);
        graph.step(0.5);
        assert_eq!(graph.time(node), 0.5);
    }

    #[test]
    fn finite_duration_latches_done() {
        let (mut graph, node) = graph_with_once_clip(1.0);
        graph.play(node);
        graph.step(0.75);
        assert!(!graph.is_done(node));
        graph.step(0.75);
        assert!(graph.is_done(node));
    }

    #[test]
    fn looping_clip_never_reports_done() {
        let mut graph = LocalGraph::new();
        let clip = AnimationClip::looping("run", 1.0);
        let node = graph.create_node(&clip);
        graph.play(node);
        graph.step(10.0);
        assert!(!graph.is_done(node));
        assert!(graph.duration(node).is_infinite());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = LocalGraph::new();
        let clip = AnimationClip::once("clip", 1.0);
        let first = graph.create_node(&clip);
        graph.destroy_node(first);
        let second = graph.create_node(&clip);
        assert_ne!(first, second);
    }

    #[test]
    fn destroy_scrubs_mixer_inputs() {
        let mut graph = LocalGraph::new();
        let clip = AnimationClip::once("clip", 1.0);
        let mixer = graph.create_mixer();
        let node = graph.create_node(&clip);
        graph.connect(mixer, 0, node);
        graph.set_input_weight(mixer, 0, 1.0);

        graph.destroy_node(node);
        assert_eq!(graph.input(mixer, 0), None);
        // The input slot itself survives; only the connection is scrubbed.
        assert_eq!(graph.input_weight(mixer, 0), 1.0);
    }

    #[test]
    fn negative_speed_rewinds_the_clock() {
        let (mut graph, node) = graph_with_once_clip(2.0);
        graph.set_time(node, 1.0);
        graph.set_speed(node, -1.0);
        graph.play(node);
        graph.step(0.25);
        assert_eq!(graph.time(node), 0.75);
    }
}
