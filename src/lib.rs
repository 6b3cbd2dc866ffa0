#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::doc_markdown)]

pub mod clip;
pub mod errors;
pub mod graph;
pub mod handle;
pub mod local_graph;
pub mod mixer;
pub mod queue;
pub mod settings;
pub mod state;
pub mod table;

pub use clip::{AnimationClip, LoopMode};
pub use errors::{AnimixError, Result};
pub use graph::{MixerGraph, NodeId};
pub use handle::{StateCursor, StateHandle, StateMut, StateRef};
pub use local_graph::LocalGraph;
pub use mixer::{AnimationMixer, DoneCallback};
pub use queue::QueueMode;
pub use settings::MixerSettings;
pub use state::AnimationState;
pub use table::StateTable;
