//! Mixer Settings
//!
//! Configuration consumed when an [`AnimationMixer`](crate::AnimationMixer)
//! is constructed. The connection-management policy can also be changed at
//! runtime via
//! [`set_keep_stopped_nodes_connected`](crate::AnimationMixer::set_keep_stopped_nodes_connected).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use animix::{AnimationMixer, LocalGraph, MixerSettings};
//!
//! // Default: stopped nodes stay connected, silenced by a zero weight.
//! let mixer = AnimationMixer::new(LocalGraph::new());
//!
//! // Aggressively disconnect stopped nodes from the mixing graph.
//! let mixer = AnimationMixer::with_settings(
//!     LocalGraph::new(),
//!     MixerSettings { keep_stopped_nodes_connected: false },
//! );
//! ```

/// Global configuration for mixer construction.
#[derive(Debug, Clone)]
pub struct MixerSettings {
    /// Keep disabled states' nodes connected to the mixer.
    ///
    /// When `true` (the default), a stopped state's node stays wired to its
    /// mixer input and is silenced by a zero weight. Re-enabling it is cheap
    /// and never restructures the graph.
    ///
    /// When `false`, the tick's enable/disable resolution disconnects the
    /// inputs of disabled states and reconnects them when they are enabled
    /// again. Some graph backends evaluate connected inputs even at zero
    /// weight; disconnecting buys that evaluation back at the cost of graph
    /// churn on every start and stop.
    pub keep_stopped_nodes_connected: bool,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            keep_stopped_nodes_connected: true,
        }
    }
}
