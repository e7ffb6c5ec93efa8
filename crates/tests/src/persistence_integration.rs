//! Integration tests for saving and restoring the chain
//!
//! Each test writes a graph through `StateStore` into a temporary directory
//! and rebuilds it from what was read back.

use cadenza_core::domain::config::StateStore;
use cadenza_core::domain::effects::{
    AudioUnitComponent, AudioUnitParameter, AudioUnitRegistry, EffectsUnit, EffectsUnitState,
    EqType, FilterBand, PresetUnit, ReverbSpace,
};
use cadenza_core::domain::graph::AudioGraph;
use cadenza_core::domain::persistence::{AudioGraphState, EqUnitState};
use cadenza_infra::audio::ChainReader;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn host() -> Arc<AudioUnitRegistry> {
    let mut registry = AudioUnitRegistry::new();
    registry.register(
        AudioUnitComponent {
            component_type: "aufx".parse().unwrap(),
            component_sub_type: "dcmp".parse().unwrap(),
            name: "Dynamics Processor".to_string(),
            version: "1.0".to_string(),
            manufacturer_name: "Test".to_string(),
        },
        vec![
            AudioUnitParameter::new(0, -20.0),
            AudioUnitParameter::new(1, 2.0),
        ],
    );
    Arc::new(registry)
}

async fn save_and_reload(graph: &AudioGraph, dir: &Path) -> AudioGraph {
    let store = StateStore::new(dir.to_path_buf());
    store.save(&graph.persistent_state()).await.unwrap();
    AudioGraph::from_state(store.load().await, host())
}

// ============================================================================
// ROUND TRIPS
// ============================================================================

#[tokio::test]
async fn test_full_chain_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = AudioGraph::new(host());

    graph.set_volume(0.7);
    graph.set_pan(-0.3);
    {
        let master = graph.master_mut();
        master.eq_mut().toggle_state();
        master.eq_mut().apply_preset_named("Jazz");
        master.eq_mut().save_preset("Mine");
        master.time_mut().set_rate(1.25);
        master.time_mut().set_shift_pitch(true);
        master.reverb_mut().set_space(ReverbSpace::Plate);
        master.delay_mut().set_time(0.5);
        master.filter_mut().add_band(FilterBand::band_pass(200.0, 800.0));
    }
    graph.add_audio_unit("aufx".parse().unwrap(), "dcmp".parse().unwrap());
    graph
        .master_mut()
        .hosted_unit_mut(0)
        .unwrap()
        .set_parameter(1, 4.0);

    let restored = save_and_reload(&graph, temp_dir.path()).await;

    assert_eq!(restored.volume(), 0.7);
    assert_eq!(restored.pan(), -0.3);
    assert_eq!(restored.master().eq().state(), EffectsUnitState::Active);
    assert_eq!(restored.master().eq().bands(), graph.master().eq().bands());
    assert!(restored.master().eq().presets().is_user_defined("Mine"));
    assert_eq!(restored.master().time().rate(), 1.25);
    assert!(restored.master().time().shift_pitch());
    assert_eq!(restored.master().reverb().space(), ReverbSpace::Plate);
    assert_eq!(restored.master().delay().time(), 0.5);
    assert_eq!(restored.master().filter().bands(), graph.master().filter().bands());

    let hosted = restored.master().hosted_unit(0).unwrap();
    assert_eq!(hosted.name(), "Dynamics Processor");
    assert_eq!(hosted.parameters()[1].value, 4.0);

    assert_eq!(restored.persistent_state(), graph.persistent_state());
}

#[tokio::test]
async fn test_restored_chain_drives_render_nodes() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = AudioGraph::new(host());
    graph.master_mut().pitch_mut().toggle_state();
    graph.master_mut().pitch_mut().set_pitch(-700.0);
    graph.set_muted(true);

    let restored = save_and_reload(&graph, temp_dir.path()).await;
    let snapshot = ChainReader::new(restored.render_handles()).snapshot();

    assert!(snapshot.pitch_active);
    assert_eq!(snapshot.pitch_cents, -700.0);
    assert_eq!(snapshot.gain, 0.0);
}

#[tokio::test]
async fn test_sound_profiles_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = AudioGraph::new(host());
    let file = Path::new("/music/album/01.flac");

    graph.set_volume(0.4);
    graph.master_mut().reverb_mut().set_amount(25.0);
    graph.remember_sound_profile(file);

    let mut restored = save_and_reload(&graph, temp_dir.path()).await;
    assert_eq!(restored.master().sound_profiles().len(), 1);

    restored.set_volume(1.0);
    assert!(restored.apply_sound_profile(file));
    assert_eq!(restored.volume(), 0.4);
    assert_eq!(restored.master().reverb().amount(), 25.0);
}

// ============================================================================
// DEGRADED INPUT
// ============================================================================

#[tokio::test]
async fn test_missing_component_dropped_on_restore() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = AudioGraph::new(host());
    graph.add_audio_unit("aufx".parse().unwrap(), "dcmp".parse().unwrap());

    let store = StateStore::new(temp_dir.path().to_path_buf());
    store.save(&graph.persistent_state()).await.unwrap();

    // Component uninstalled between runs
    let restored = AudioGraph::from_state(store.load().await, Arc::new(AudioUnitRegistry::new()));
    assert!(restored.master().hosted_units().is_empty());
}

#[tokio::test]
async fn test_corrupt_state_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path().to_path_buf());
    tokio::fs::write(store.state_path(), "[1, 2").await.unwrap();

    let graph = AudioGraph::from_state(store.load().await, host());
    assert_eq!(graph.persistent_state(), AudioGraph::new(host()).persistent_state());
    assert!(temp_dir.path().join("state.json.corrupt").exists());
}

#[tokio::test]
async fn test_incomplete_presets_keep_rest_of_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path().to_path_buf());
    let json = r#"{
        "volume": 0.3,
        "pan": -0.5,
        "reverb_unit": { "state": "active", "amount": 20.0 },
        "time_unit": { "user_presets": [ { "name": "Slow", "rate": 0.5 } ] }
    }"#;
    tokio::fs::write(store.state_path(), json).await.unwrap();

    let mut graph = AudioGraph::from_state(store.load().await, host());

    assert!(!temp_dir.path().join("state.json.corrupt").exists());
    assert_eq!(graph.volume(), 0.3);
    assert_eq!(graph.pan(), -0.5);
    assert!(graph.master().reverb().is_active());
    assert_eq!(graph.master().reverb().amount(), 20.0);

    assert!(graph.master().time().presets().is_user_defined("Slow"));
    let slow = graph.master().time().presets().preset("Slow").unwrap();
    assert_eq!(slow.rate, 0.5);
    assert_eq!(slow.overlap, 8.0);

    assert!(graph.master_mut().time_mut().apply_preset_named("Slow"));
    assert_eq!(graph.master().time().rate(), 0.5);
    assert_eq!(graph.master().time().state(), EffectsUnitState::Bypassed);
}

#[tokio::test]
async fn test_ten_band_state_keeps_layout() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path().to_path_buf());

    let state = AudioGraphState {
        eq_unit: Some(EqUnitState {
            eq_type: Some(EqType::TenBand),
            bands: Some(vec![1.0; 10]),
            ..Default::default()
        }),
        ..Default::default()
    };
    store.save(&state).await.unwrap();

    let graph = AudioGraph::from_state(store.load().await, host());
    assert_eq!(graph.master().eq().eq_type(), EqType::TenBand);
    assert_eq!(graph.master().eq().bands(), &[1.0; 10]);

    let json: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(store.state_path()).await.unwrap())
            .unwrap();
    assert_eq!(json["eq_unit"]["type"], "ten_band");
}
