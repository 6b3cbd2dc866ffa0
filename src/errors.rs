//! Error Types
//!
//! This module defines the error types used throughout the mixer.
//!
//! # Overview
//!
//! The main error type [`AnimixError`] covers all failure modes including:
//! - By-name lookups that match no live state
//! - Name collisions when registering clips
//! - Rejected arguments (negative weights, empty names)
//! - Stale handles and cursors used after a structural change
//!
//! Every failure is local and recoverable: the state table is never left in a
//! partially mutated condition, and the caller may retry with corrected input.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, AnimixError>`.
//!
//! ```rust,ignore
//! use animix::errors::{AnimixError, Result};
//!
//! fn start_walk(mixer: &mut Mixer) -> Result<()> {
//!     mixer.crossfade("walk", 0.3)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the animix mixer.
///
/// Each variant provides specific context about what went wrong. None of them
/// indicate corruption; the mixer remains fully usable after any of these.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnimixError {
    /// A by-name operation (`play`, `stop`, `crossfade`, `blend`, `rewind`,
    /// clip removal, …) matched no live state.
    #[error("No animation state named `{0}`")]
    NameNotFound(String),

    /// A clip was added under a name that is already taken by a live state.
    #[error("An animation state named `{0}` already exists")]
    DuplicateName(String),

    /// A caller-supplied value was rejected before mutating anything.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A captured [`StateHandle`](crate::StateHandle) or
    /// [`StateCursor`](crate::StateCursor) was used after the slot it
    /// references was removed, or after the state table structurally changed.
    #[error("Invalid handle: the referenced animation state no longer exists")]
    InvalidHandle,
}

/// Alias for `Result<T, AnimixError>`.
pub type Result<T> = std::result::Result<T, AnimixError>;
