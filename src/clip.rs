use std::sync::Arc;

/// Playback wrap behavior of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play through once, then stop at the end (or at the start when playing
    /// backwards).
    Once,
    /// Wrap around indefinitely; the clip never finishes on its own.
    Loop,
}

/// An immutable animation clip resource.
///
/// The mixer never samples clip data; it only needs the clip's duration and
/// wrap behavior to drive fades, one-shot completion, and queued transitions.
/// Decoded keyframes, curves, or poses live behind the mixing graph.
///
/// Clips are shared between states via `Arc`: a queued clone of a state
/// references the same clip as its original.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// Length of one playthrough in seconds.
    pub duration: f32,
    pub loop_mode: LoopMode,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, duration: f32, loop_mode: LoopMode) -> Self {
        Self {
            name: name.into(),
            duration,
            loop_mode,
        }
    }

    /// Shorthand for a shared play-once clip.
    #[must_use]
    pub fn once(name: impl Into<String>, duration: f32) -> Arc<Self> {
        Arc::new(Self::new(name, duration, LoopMode::Once))
    }

    /// Shorthand for a shared looping clip.
    #[must_use]
    pub fn looping(name: impl Into<String>, duration: f32) -> Arc<Self> {
        Arc::new(Self::new(name, duration, LoopMode::Loop))
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.loop_mode == LoopMode::Loop
    }
}
