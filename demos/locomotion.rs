//! Locomotion showcase driven by the in-memory graph.
//!
//! Run with `RUST_LOG=debug cargo run --example locomotion` to see the
//! mixer's lifecycle logging between the printed weight tables.

use animix::{AnimationClip, AnimationMixer, LocalGraph, QueueMode};

const DT: f32 = 1.0 / 60.0;

fn main() -> animix::Result<()> {
    env_logger::init();

    let mut mixer = AnimationMixer::new(LocalGraph::new());
    mixer.add_clip(AnimationClip::looping("idle", 1.5), "idle")?;
    mixer.add_clip(AnimationClip::looping("walk", 1.0), "walk")?;
    mixer.add_clip(AnimationClip::once("vault", 2.0), "vault")?;
    mixer.set_on_done(|| println!("  <every state stopped>"));

    // 1. One-shot playback: the vault stops itself at the two-second mark.
    println!("play(\"vault\")");
    mixer.play("vault")?;
    run(&mut mixer, 150)?;

    // 2. Exclusive play, then a half-second crossfade into the walk cycle.
    println!("play(\"idle\"), then crossfade(\"walk\", 0.5)");
    mixer.play("idle")?;
    run(&mut mixer, 30)?;
    mixer.crossfade("walk", 0.5)?;
    run(&mut mixer, 60)?;

    // 3. Layer the vault over the walk without interrupting it.
    println!("blend(\"vault\", 0.5, 0.25)");
    mixer.blend("vault", 0.5, 0.25)?;
    run(&mut mixer, 150)?;

    // 4. Replay the vault and queue the idle behind it; the queued clone
    //    promotes once the vault's remaining time drops below its fade.
    println!("crossfade(\"vault\", 0.5), then crossfade_queued(\"idle\", 0.5, CompleteOthers)");
    mixer.crossfade("vault", 0.5)?;
    mixer.crossfade_queued("idle", 0.5, QueueMode::CompleteOthers)?;
    while mixer.pending_transitions() > 0 {
        run(&mut mixer, 15)?;
    }
    run(&mut mixer, 45)?;

    println!("idle playing: {}", mixer.is_playing_state("idle"));
    println!("walk playing: {}", mixer.is_playing_state("walk"));
    Ok(())
}

/// Advance `frames` fixed steps, printing the state table every quarter second.
fn run(mixer: &mut AnimationMixer<LocalGraph>, frames: u32) -> animix::Result<()> {
    for frame in 0..frames {
        mixer.update(DT);
        mixer.graph_mut().step(DT);
        if frame % 15 == 14 {
            print_states(mixer)?;
        }
    }
    Ok(())
}

/// One line per live state; a `*` marks states that are currently stopped.
fn print_states(mixer: &AnimationMixer<LocalGraph>) -> animix::Result<()> {
    let mut columns = Vec::new();
    let mut states = mixer.states();
    while let Some(handle) = states.next(mixer)? {
        let state = mixer.state(handle)?;
        let marker = if state.enabled() { "" } else { "*" };
        columns.push(format!(
            "{}{} w={:.2} t={:.2}",
            state.name(),
            marker,
            state.weight(),
            state.time()
        ));
    }
    println!("  {}", columns.join(" | "));
    Ok(())
}
