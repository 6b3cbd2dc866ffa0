//! Handle, Cursor & Connection Tests
//!
//! Tests for:
//! - Handle lookup, validation, and staleness across slot reuse
//! - StateRef reads: time, normalized time, speed-adjusted length
//! - StateMut writes: enabled, time, speed, weight, rename
//! - Cursor enumeration and revision-based invalidation
//! - The stopped-node connection policy, at construction and at runtime

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use animix::{
    AnimationClip, AnimationMixer, AnimixError, LocalGraph, LoopMode, MixerGraph, MixerSettings,
    QueueMode,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_mixer() -> AnimationMixer<LocalGraph> {
    AnimationMixer::new(LocalGraph::new())
}

/// One frame: tick the mixer, then advance the graph clocks.
fn advance(mixer: &mut AnimationMixer<LocalGraph>, dt: f32) {
    mixer.update(dt);
    mixer.graph_mut().step(dt);
}

// ============================================================================
// Handle Validation
// ============================================================================

#[test]
fn find_returns_handles_for_live_states() {
    let mut mixer = make_mixer();
    let added = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();

    let found = mixer.find("walk").unwrap();
    assert_eq!(found.index(), added.index());
    assert_eq!(found.node(), added.node());
    assert!(mixer.is_valid(found));
    assert!(mixer.find("ghost").is_none());
}

#[test]
fn handles_survive_non_structural_changes() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();

    mixer.play("walk").unwrap();
    mixer.crossfade("run", 0.5).unwrap();
    advance(&mut mixer, 0.25);
    mixer.stop("walk").unwrap();
    advance(&mut mixer, 0.25);

    assert!(mixer.is_valid(walk));
    assert_eq!(mixer.state(walk).unwrap().name(), "walk");
}

#[test]
fn removing_the_state_invalidates_its_handles() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer.remove_clip("walk").unwrap();

    assert!(!mixer.is_valid(walk));
    assert_eq!(mixer.state(walk).unwrap_err(), AnimixError::InvalidHandle);
    assert_eq!(
        mixer.state_mut(walk).unwrap_err(),
        AnimixError::InvalidHandle
    );
}

#[test]
fn reused_slot_does_not_resurrect_stale_handles() {
    let mut mixer = make_mixer();
    let old = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer.remove_clip("walk").unwrap();

    let new = mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();
    assert_eq!(new.index(), old.index(), "slot index is reused");
    assert_ne!(new.node(), old.node(), "node identity is not");
    assert!(!mixer.is_valid(old));
    assert!(mixer.state(old).is_err());
    assert_eq!(mixer.state(new).unwrap().name(), "run");
}

// ============================================================================
// StateRef Reads
// ============================================================================

#[test]
fn state_ref_reports_playback_values() {
    let mut mixer = make_mixer();
    let clip = AnimationClip::once("vault", 2.0);
    let vault = mixer.add_clip(clip.clone(), "vault").unwrap();
    mixer.play("vault").unwrap();
    advance(&mut mixer, 0.5);

    let state = mixer.state(vault).unwrap();
    assert_eq!(state.name(), "vault");
    assert!(state.enabled());
    assert!(!state.is_clone());
    assert_eq!(state.index(), vault.index());
    assert!(approx(state.weight(), 1.0));
    assert!(approx(state.time(), 0.5));
    assert!(approx(state.normalized_time(), 0.25));
    assert!(approx(state.speed(), 1.0));
    assert!(approx(state.length(), 2.0));
    assert_eq!(state.loop_mode(), LoopMode::Once);
    assert!(Arc::ptr_eq(state.clip(), &clip));
}

#[test]
fn length_accounts_for_playback_speed() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 2.0), "walk")
        .unwrap();

    mixer.state_mut(walk).unwrap().set_speed(2.0);
    assert!(approx(mixer.state(walk).unwrap().length(), 1.0));

    mixer.state_mut(walk).unwrap().set_speed(-2.0);
    assert!(approx(mixer.state(walk).unwrap().length(), -1.0));

    mixer.state_mut(walk).unwrap().set_speed(0.0);
    assert!(mixer.state(walk).unwrap().length().is_infinite());
}

#[test]
fn zero_length_clips_normalize_as_one_second() {
    let mut mixer = make_mixer();
    let pose = mixer
        .add_clip(AnimationClip::once("pose", 0.0), "pose")
        .unwrap();

    mixer.state_mut(pose).unwrap().set_time(0.25);
    assert!(approx(mixer.state(pose).unwrap().normalized_time(), 0.25));

    mixer.state_mut(pose).unwrap().set_normalized_time(0.5);
    assert!(approx(mixer.state(pose).unwrap().time(), 0.5));
}

// ============================================================================
// StateMut Writes
// ============================================================================

#[test]
fn set_time_pushes_eagerly_and_flags_done() {
    let mut mixer = make_mixer();
    let vault = mixer
        .add_clip(AnimationClip::once("vault", 2.0), "vault")
        .unwrap();

    mixer.state_mut(vault).unwrap().set_time(2.5);
    assert!(approx(mixer.state(vault).unwrap().time(), 2.5));
    assert!(mixer.graph().is_done(vault.node()));

    // Seeking back inside the clip clears the flag again.
    mixer.state_mut(vault).unwrap().set_time(1.0);
    assert!(!mixer.graph().is_done(vault.node()));
}

#[test]
fn set_normalized_time_scales_by_clip_length() {
    let mut mixer = make_mixer();
    let vault = mixer
        .add_clip(AnimationClip::once("vault", 2.0), "vault")
        .unwrap();

    mixer.state_mut(vault).unwrap().set_normalized_time(0.75);
    assert!(approx(mixer.state(vault).unwrap().time(), 1.5));
}

#[test]
fn set_weight_validates_and_defers_the_push() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();
    mixer.play("walk").unwrap();
    mixer.blend("run", 1.0, 0.0).unwrap();
    advance(&mut mixer, 0.1);

    let mixer_node = mixer.mixer_node();
    assert!(approx(mixer.graph().input_weight(mixer_node, 0), 0.5));

    mixer.state_mut(walk).unwrap().set_weight(3.0).unwrap();
    assert!(approx(mixer.state(walk).unwrap().weight(), 3.0));
    // The graph still holds last tick's normalization until the next tick.
    assert!(approx(mixer.graph().input_weight(mixer_node, 0), 0.5));

    advance(&mut mixer, 0.1);
    assert!(approx(mixer.graph().input_weight(mixer_node, 0), 0.75));
    assert!(approx(mixer.graph().input_weight(mixer_node, 1), 0.25));

    let err = mixer.state_mut(walk).unwrap().set_weight(-1.0).unwrap_err();
    assert!(matches!(err, AnimixError::InvalidArgument(_)));
    assert!(approx(mixer.state(walk).unwrap().weight(), 3.0));
}

#[test]
fn set_weight_leaves_an_active_fade_running() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer.blend("walk", 1.0, 1.0).unwrap();
    advance(&mut mixer, 0.25);
    assert!(approx(mixer.state(walk).unwrap().weight(), 0.25));

    // Jumping the weight does not cancel the fade; it keeps moving toward
    // the same target at the same rate from the new value.
    mixer.state_mut(walk).unwrap().set_weight(0.9).unwrap();
    advance(&mut mixer, 0.25);
    assert!(approx(mixer.state(walk).unwrap().weight(), 1.0));
}

#[test]
fn rename_updates_by_name_lookup() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();

    mixer.state_mut(walk).unwrap().rename("sprint").unwrap();
    assert!(mixer.find("walk").is_none());
    assert!(mixer.find("sprint").is_some());
    mixer.play("sprint").unwrap();

    let err = mixer.state_mut(walk).unwrap().rename("").unwrap_err();
    assert!(matches!(err, AnimixError::InvalidArgument(_)));
    assert_eq!(mixer.state(walk).unwrap().name(), "sprint");
}

#[test]
fn disabling_pauses_without_clearing_the_weight() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer.play("walk").unwrap();
    advance(&mut mixer, 0.25);

    mixer.state_mut(walk).unwrap().set_enabled(false);
    assert!(!mixer.is_playing());

    // The tick pauses the node; its clock freezes while the weight is kept.
    advance(&mut mixer, 0.25);
    let frozen = mixer.state(walk).unwrap().time();
    advance(&mut mixer, 0.25);
    assert!(approx(mixer.state(walk).unwrap().time(), frozen));
    assert!(approx(mixer.state(walk).unwrap().weight(), 1.0));
}

#[test]
fn enabling_rearms_the_done_notification() {
    let mut mixer = make_mixer();
    let hit = mixer
        .add_clip(AnimationClip::once("hit", 1.0), "hit")
        .unwrap();
    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    mixer.set_on_done(move || counter.set(counter.get() + 1));

    mixer.play("hit").unwrap();
    for _ in 0..3 {
        advance(&mut mixer, 0.5);
    }
    assert!(mixer.is_done());
    assert_eq!(fired.get(), 1);

    mixer.state_mut(hit).unwrap().set_enabled(true);
    assert!(!mixer.is_done());
    for _ in 0..6 {
        advance(&mut mixer, 0.25);
    }
    assert_eq!(fired.get(), 2, "completion fires once per playthrough");
}

// ============================================================================
// Cursors
// ============================================================================

#[test]
fn cursor_enumerates_live_states_in_slot_order() {
    let mut mixer = make_mixer();
    mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("idle", 1.0), "idle")
        .unwrap();
    mixer.remove_clip("run").unwrap();

    let mut cursor = mixer.states();
    let mut names = Vec::new();
    while let Some(handle) = cursor.next(&mixer).unwrap() {
        names.push(mixer.state(handle).unwrap().name().to_owned());
    }
    assert_eq!(names, ["walk", "idle"]);
}

#[test]
fn cursor_fails_after_an_insert() {
    let mut mixer = make_mixer();
    mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();

    let mut cursor = mixer.states();
    assert!(cursor.next(&mixer).unwrap().is_some());

    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();
    assert_eq!(cursor.next(&mixer).unwrap_err(), AnimixError::InvalidHandle);
}

#[test]
fn cursor_fails_after_a_remove() {
    let mut mixer = make_mixer();
    mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();

    let mut cursor = mixer.states();
    mixer.remove_clip("run").unwrap();
    assert_eq!(cursor.next(&mixer).unwrap_err(), AnimixError::InvalidHandle);
}

#[test]
fn cursor_fails_after_a_clone_sweep() {
    let mut mixer = make_mixer();
    mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer.play("walk").unwrap();
    mixer
        .crossfade_queued("walk", 1.0, QueueMode::CompleteOthers)
        .unwrap();

    let mut cursor = mixer.states();
    // Stopping flags the clone but removes nothing: not yet structural.
    mixer.stop("walk").unwrap();
    assert!(cursor.next(&mixer).unwrap().is_some());

    // The next tick sweeps the clone, which is.
    advance(&mut mixer, 0.1);
    assert_eq!(cursor.next(&mixer).unwrap_err(), AnimixError::InvalidHandle);
}

#[test]
fn cursor_ignores_playback_mutations() {
    let mut mixer = make_mixer();
    mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    mixer
        .add_clip(AnimationClip::looping("run", 1.0), "run")
        .unwrap();

    let mut cursor = mixer.states();
    mixer.play("walk").unwrap();
    mixer.crossfade("run", 0.5).unwrap();
    advance(&mut mixer, 0.25);

    let mut seen = 0;
    while cursor.next(&mixer).unwrap().is_some() {
        seen += 1;
    }
    assert_eq!(seen, 2);
}

// ============================================================================
// Connection Management
// ============================================================================

#[test]
fn default_keeps_stopped_nodes_connected() {
    let mut mixer = make_mixer();
    assert!(mixer.settings().keep_stopped_nodes_connected);

    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    let mixer_node = mixer.mixer_node();
    assert_eq!(
        mixer.graph().input(mixer_node, walk.index()),
        Some(walk.node()),
        "connected on registration"
    );

    mixer.play("walk").unwrap();
    advance(&mut mixer, 0.25);
    mixer.stop("walk").unwrap();
    advance(&mut mixer, 0.25);
    assert_eq!(
        mixer.graph().input(mixer_node, walk.index()),
        Some(walk.node()),
        "still connected after stopping"
    );
}

#[test]
fn disconnects_stopped_nodes_when_configured() {
    let mut mixer = AnimationMixer::with_settings(
        LocalGraph::new(),
        MixerSettings {
            keep_stopped_nodes_connected: false,
        },
    );
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    let mixer_node = mixer.mixer_node();
    assert_eq!(mixer.graph().input(mixer_node, walk.index()), None);

    mixer.play("walk").unwrap();
    advance(&mut mixer, 0.25);
    assert_eq!(
        mixer.graph().input(mixer_node, walk.index()),
        Some(walk.node())
    );

    mixer.stop("walk").unwrap();
    advance(&mut mixer, 0.25);
    assert_eq!(mixer.graph().input(mixer_node, walk.index()), None);
}

#[test]
fn toggling_the_connection_policy_reconciles_immediately() {
    let mut mixer = make_mixer();
    let walk = mixer
        .add_clip(AnimationClip::looping("walk", 1.0), "walk")
        .unwrap();
    let mixer_node = mixer.mixer_node();

    mixer.set_keep_stopped_nodes_connected(false);
    assert!(!mixer.settings().keep_stopped_nodes_connected);
    assert_eq!(mixer.graph().input(mixer_node, walk.index()), None);

    mixer.set_keep_stopped_nodes_connected(true);
    assert_eq!(
        mixer.graph().input(mixer_node, walk.index()),
        Some(walk.node())
    );
}
