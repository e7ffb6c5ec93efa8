//! Example walking through the effects chain and its state file
//!
//! Run with: cargo run --package cadenza-core --example chain_demo

use cadenza_core::domain::config::StateStore;
use cadenza_core::domain::effects::{
    AudioUnitComponent, AudioUnitParameter, AudioUnitRegistry, EffectsUnit, FilterBand,
    PresetUnit, ReverbSpace,
};
use cadenza_core::domain::graph::AudioGraph;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("cadenza_core=debug,info")
        .init();

    println!("=== Cadenza Effects Chain Demo ===\n");

    // 1. A host with one plugin installed
    let mut registry = AudioUnitRegistry::new();
    registry.register(
        AudioUnitComponent {
            component_type: "aufx".parse()?,
            component_sub_type: "dcmp".parse()?,
            name: "Dynamics Processor".to_string(),
            version: "1.0".to_string(),
            manufacturer_name: "Demo".to_string(),
        },
        vec![
            AudioUnitParameter::new(0, -20.0),
            AudioUnitParameter::new(1, 2.0),
        ],
    );

    // 2. Build a default graph
    let mut graph = AudioGraph::new(Arc::new(registry));
    println!("1. Default graph: volume {}, pan {}", graph.volume(), graph.pan());

    // 3. Shape the sound
    println!("\n2. Enabling EQ (Rock), reverb and a band-stop filter...");
    {
        let master = graph.master_mut();
        master.eq_mut().toggle_state();
        master.eq_mut().apply_preset_named("Rock");
        master.reverb_mut().toggle_state();
        master.reverb_mut().set_space(ReverbSpace::Cathedral);
        master.filter_mut().toggle_state();
        master.filter_mut().add_band(FilterBand::band_stop(1000.0, 4000.0));
    }
    for (kind, state) in graph.master().unit_states() {
        println!("   {:<14} {}", kind.to_string(), state);
    }

    // 4. Host a plugin
    println!("\n3. Adding a hosted audio unit...");
    if let Some((unit, index)) = graph.add_audio_unit("aufx".parse()?, "dcmp".parse()?) {
        println!("   ✓ '{}' by {} at index {}", unit.name(), unit.manufacturer_name(), index);
    }

    // 5. Remember a sound profile for a file
    let file = Path::new("/music/album/track01.flac");
    graph.set_volume(0.8);
    graph.remember_sound_profile(file);
    println!("\n4. Sound profile saved for {}", file.display());

    // 6. Save and reload
    let dir = std::env::temp_dir().join("cadenza-demo");
    let store = StateStore::new(dir);
    store.save(&graph.persistent_state()).await?;
    println!("\n5. State written to {}", store.state_path().display());

    let restored = AudioGraph::from_state(store.load().await, Arc::clone(graph.host()));
    println!(
        "   ✓ Restored: volume {}, EQ {}, {} hosted unit(s), {} profile(s)",
        restored.volume(),
        restored.master().eq().state(),
        restored.master().hosted_units().len(),
        restored.master().sound_profiles().len()
    );

    store.clear().await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
