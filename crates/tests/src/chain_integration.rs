//! Integration tests for the effects chain
//!
//! These drive the chain through `AudioGraph` the way the player does and
//! check what the render side observes through `ChainReader`.

use cadenza_core::domain::effects::{
    AudioUnitComponent, AudioUnitParameter, AudioUnitRegistry, EffectsUnit, EffectsUnitKind,
    EffectsUnitState, FilterBand, FourCc, PresetUnit, ReverbSpace,
};
use cadenza_core::domain::graph::AudioGraph;
use cadenza_infra::audio::{ChainReader, ChainSnapshot, OutputStage};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn fourcc(code: &str) -> FourCc {
    code.parse().unwrap()
}

fn registry() -> AudioUnitRegistry {
    let mut registry = AudioUnitRegistry::new();
    registry.register(
        AudioUnitComponent {
            component_type: fourcc("aufx"),
            component_sub_type: fourcc("dcmp"),
            name: "Dynamics Processor".to_string(),
            version: "1.0".to_string(),
            manufacturer_name: "Test".to_string(),
        },
        vec![AudioUnitParameter::new(0, -20.0)],
    );
    registry
}

fn graph() -> AudioGraph {
    AudioGraph::new(Arc::new(registry()))
}

// ============================================================================
// MASTER OVERRIDE
// ============================================================================

#[test]
fn test_master_bypass_silences_every_unit() {
    let mut graph = graph();
    let reader = ChainReader::new(graph.render_handles());

    {
        let master = graph.master_mut();
        master.eq_mut().toggle_state();
        master.reverb_mut().toggle_state();
        master.delay_mut().toggle_state();
    }
    assert_eq!(reader.snapshot().active_native_units(), 3);

    graph.master_mut().toggle_state();
    let snapshot = reader.snapshot();
    assert!(!snapshot.master_active);
    assert_eq!(snapshot.active_native_units(), 0);

    // Child states survive the override
    assert!(graph.master().eq().is_active());
    assert!(!graph.master().is_unit_audible(EffectsUnitKind::Eq));

    graph.master_mut().toggle_state();
    assert_eq!(reader.snapshot().active_native_units(), 3);
}

#[test]
fn test_suppress_and_unsuppress_cascade() {
    let mut graph = graph();
    graph.master_mut().eq_mut().toggle_state();
    graph.master_mut().pitch_mut().toggle_state();

    graph.master_mut().suppress_native_units();
    assert_eq!(graph.master().eq().state(), EffectsUnitState::Suppressed);
    assert_eq!(graph.master().pitch().state(), EffectsUnitState::Suppressed);
    // Bypassed units stay bypassed
    assert_eq!(graph.master().reverb().state(), EffectsUnitState::Bypassed);

    // Toggling a suppressed unit is a no-op
    assert_eq!(
        graph.master_mut().eq_mut().toggle_state(),
        EffectsUnitState::Suppressed
    );

    graph.master_mut().unsuppress_native_units();
    assert_eq!(graph.master().eq().state(), EffectsUnitState::Active);
    assert_eq!(graph.master().pitch().state(), EffectsUnitState::Active);
    assert_eq!(graph.master().reverb().state(), EffectsUnitState::Bypassed);
}

// ============================================================================
// PARAMETERS REACHING THE RENDER SIDE
// ============================================================================

#[test]
fn test_eq_preset_visible_to_reader() {
    let mut graph = graph();
    let reader = ChainReader::new(graph.render_handles());

    let eq = graph.master_mut().eq_mut();
    eq.toggle_state();
    assert!(eq.apply_preset_named("Rock"));
    let expected: Vec<f32> = eq.bands().to_vec();

    let snapshot = reader.snapshot();
    assert!(snapshot.eq_active);
    assert_eq!(&snapshot.eq_gains[..snapshot.eq_band_count], expected.as_slice());
}

#[test]
fn test_time_stretch_node_selection() {
    let mut graph = graph();
    let reader = ChainReader::new(graph.render_handles());

    let time = graph.master_mut().time_mut();
    time.set_rate(1.5);
    time.toggle_state();

    let snapshot = reader.snapshot();
    assert!(snapshot.time_pitch_active);
    assert!(!snapshot.varispeed_active);
    assert_eq!(snapshot.rate, 1.5);

    graph.master_mut().time_mut().set_shift_pitch(true);
    let snapshot = reader.snapshot();
    assert!(snapshot.varispeed_active);
    assert!(!snapshot.time_pitch_active);
    assert_eq!(snapshot.rate, 1.5);
}

#[test]
fn test_reverb_and_filter_parameters() {
    let mut graph = graph();
    let reader = ChainReader::new(graph.render_handles());

    {
        let master = graph.master_mut();
        master.reverb_mut().set_space(ReverbSpace::Cathedral);
        master.reverb_mut().set_amount(80.0);
        master.filter_mut().add_band(FilterBand::low_pass(500.0));
        master.filter_mut().add_band(FilterBand::band_stop(1000.0, 2000.0));
    }

    let snapshot = reader.snapshot();
    assert_eq!(snapshot.reverb_space, ReverbSpace::Cathedral.node_preset());
    assert_eq!(snapshot.reverb_mix, 80.0);
    assert_eq!(snapshot.filter_bands, 2);
}

#[test]
fn test_hosted_units_follow_master() {
    let mut graph = graph();
    let (_, index) = graph
        .add_audio_unit(fourcc("aufx"), fourcc("dcmp"))
        .expect("registered component");
    assert_eq!(index, 0);
    assert!(graph.add_audio_unit(fourcc("aufx"), fourcc("none")).is_none());

    let reader = ChainReader::new(graph.render_handles());
    assert_eq!(reader.snapshot().hosted_active, 1);

    graph.master_mut().toggle_state();
    assert_eq!(reader.snapshot().hosted_active, 0);

    graph.master_mut().toggle_state();
    let removed = graph.remove_audio_units(&[0]);
    assert_eq!(removed.len(), 1);
    assert!(removed[0].instance().is_bypassed());
}

// ============================================================================
// OUTPUT
// ============================================================================

#[test]
fn test_output_stage_follows_graph() {
    let mut graph = graph();
    let stage = OutputStage::new(Arc::clone(&graph.render_handles().output));

    graph.set_volume(1.0);
    graph.set_pan(1.0);
    let mut buffer = [1.0_f32, 1.0];
    stage.process(&mut buffer);
    assert!(buffer[0].abs() < 0.0001);
    assert!((buffer[1] - 1.0).abs() < 0.0001);

    graph.toggle_mute();
    let mut buffer = [1.0_f32, 1.0];
    stage.process(&mut buffer);
    assert_eq!(buffer, [0.0, 0.0]);
    assert_eq!(graph.volume(), 1.0);
}

#[test]
fn test_sound_profile_restores_effects() {
    let mut graph = graph();
    let file = Path::new("/music/track.flac");

    graph.set_volume(0.9);
    graph.master_mut().pitch_mut().set_pitch(300.0);
    graph.remember_sound_profile(file);

    graph.set_volume(0.2);
    graph.master_mut().pitch_mut().set_pitch(0.0);

    assert!(graph.apply_sound_profile(file));
    assert_eq!(graph.volume(), 0.9);
    assert_eq!(graph.master().pitch().pitch(), 300.0);

    assert!(graph.forget_sound_profile(file));
    assert!(!graph.apply_sound_profile(file));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_render_thread_reads_while_controller_writes() {
    let mut graph = graph();
    let reader = ChainReader::new(graph.render_handles());
    let stop = Arc::new(AtomicBool::new(false));

    let render = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut snapshot = ChainSnapshot::default();
            let mut reads = 0_usize;
            while !stop.load(Ordering::Acquire) {
                reader.snapshot_into(&mut snapshot);
                assert!((-20.0..=20.0).contains(&snapshot.eq_gains[0]));
                assert!((0.25..=4.0).contains(&snapshot.rate));
                reads += 1;
            }
            reader.snapshot_into(&mut snapshot);
            (reads, snapshot)
        })
    };

    for i in 0..1000 {
        let master = graph.master_mut();
        master.eq_mut().set_band(0, (i % 40) as f32 - 20.0);
        master.time_mut().set_rate(1.0 + (i % 3) as f32);
        if i % 100 == 0 {
            master.toggle_state();
        }
    }
    graph.master_mut().eq_mut().set_band(0, 7.0);
    stop.store(true, Ordering::Release);

    let (reads, last) = render.join().unwrap();
    assert!(reads > 0);
    assert_eq!(last.eq_gains[0], 7.0);
}
