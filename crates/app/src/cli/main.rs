//! Cadenza CLI
//!
//! Inspects and edits the saved effects chain without starting playback.

use anyhow::Context;
use cadenza_core::domain::config::{AppConfig, StateStore};
use cadenza_core::domain::effects::{
    AudioUnitRegistry, EffectsUnit, EffectsUnitKind, EffectsUnitPreset, PresetUnit,
};
use cadenza_core::domain::graph::AudioGraph;
use cadenza_core::domain::persistence::EqUnitState;
use cadenza_infra::audio::ChainReader;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadenza")]
#[command(about = "Effects chain manager for the Cadenza player", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Preferences file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding state.json, overrides the preferences file
    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the saved chain
    Show {
        /// Print the raw state document instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List the presets of one unit
    Presets { unit: Unit },
    /// Toggle one unit between active and bypassed
    Toggle { unit: Unit },
    /// Apply a preset to one unit
    Apply { unit: Unit, preset: String },
    /// Set the player volume, or step it by the configured amount
    Volume {
        /// `up`, `down` or a level in [0, 1]
        level: VolumeArg,
    },
    /// Set the pan, or step it by the configured amount
    Pan {
        /// `left`, `right` or a position in [-1, 1]
        #[arg(allow_hyphen_values = true)]
        position: PanArg,
    },
    /// List remembered sound profiles
    Profiles,
    /// Forget the sound profile of a file
    ForgetProfile { file: PathBuf },
    /// Delete the saved chain
    Reset,
    /// List output devices
    #[cfg(feature = "cpal")]
    Devices,
}

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Master,
    Eq,
    Pitch,
    Time,
    Reverb,
    Delay,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VolumeArg {
    Up,
    Down,
    Level(f32),
}

impl FromStr for VolumeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => other
                .parse()
                .map(Self::Level)
                .map_err(|_| format!("expected up, down or a level, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PanArg {
    Left,
    Right,
    Position(f32),
}

impl FromStr for PanArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => other
                .parse()
                .map(Self::Position)
                .map_err(|_| format!("expected left, right or a position, got '{}'", other)),
        }
    }
}

/// Apply a volume command; steps use `volume_step` from the preferences
fn change_volume(graph: &mut AudioGraph, level: VolumeArg, config: &AppConfig) -> f32 {
    match level {
        VolumeArg::Up => graph.increase_volume(config.volume_step),
        VolumeArg::Down => graph.decrease_volume(config.volume_step),
        VolumeArg::Level(value) => {
            graph.set_volume(value);
            graph.volume()
        }
    }
}

/// Apply a pan command; steps use `pan_step` from the preferences
fn change_pan(graph: &mut AudioGraph, position: PanArg, config: &AppConfig) -> f32 {
    match position {
        PanArg::Left => graph.pan_left(config.pan_step),
        PanArg::Right => graph.pan_right(config.pan_step),
        PanArg::Position(value) => {
            graph.set_pan(value);
            graph.pan()
        }
    }
}

fn preset_names<U: PresetUnit>(unit: &U) -> Vec<(String, bool)> {
    let store = unit.presets();
    store
        .system_defined()
        .iter()
        .chain(store.user_defined())
        .map(|preset| (preset.name().to_string(), preset.is_user_defined()))
        .collect()
}

fn apply_named<U: PresetUnit>(unit: &mut U, name: &str) -> anyhow::Result<()> {
    if !unit.apply_preset_named(name) {
        anyhow::bail!("{} has no preset named '{}'", unit.kind(), name);
    }
    Ok(())
}

fn init_tracing(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_summary(graph: &AudioGraph) {
    let snapshot = ChainReader::new(graph.render_handles()).snapshot();

    println!(
        "Output: volume {:.2}, pan {:+.2}{}",
        graph.volume(),
        graph.pan(),
        if graph.muted() { " (muted)" } else { "" }
    );
    if let Some(device) = graph.output_device() {
        println!("Device: {}", device);
    }

    println!("\n{:<14} {}", EffectsUnitKind::Master.to_string(), graph.master().state());
    for (kind, state) in graph.master().unit_states() {
        println!("  {:<12} {}", kind.to_string(), state);
    }

    println!(
        "\n{} unit(s) processing, playback rate {:.2}x",
        snapshot.active_native_units() + snapshot.hosted_active,
        snapshot.rate
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };

    init_tracing(cli.verbose, &config.log_level);
    tracing::debug!("Cadenza CLI starting");

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => config.resolved_state_dir()?,
    };
    let store = StateStore::new(state_dir);

    let mut state = store.load().await;
    let eq_state = state.eq_unit.get_or_insert_with(EqUnitState::default);
    eq_state.eq_type.get_or_insert(config.eq_type);

    let mut graph = AudioGraph::from_state(state, Arc::new(AudioUnitRegistry::new()));

    match cli.command {
        Command::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&graph.persistent_state())?);
            } else {
                print_summary(&graph);
            }
        }

        Command::Presets { unit } => {
            let master = graph.master();
            let names = match unit {
                Unit::Master => preset_names(master),
                Unit::Eq => preset_names(master.eq()),
                Unit::Pitch => preset_names(master.pitch()),
                Unit::Time => preset_names(master.time()),
                Unit::Reverb => preset_names(master.reverb()),
                Unit::Delay => preset_names(master.delay()),
                Unit::Filter => preset_names(master.filter()),
            };
            if names.is_empty() {
                println!("No presets");
            }
            for (name, user_defined) in names {
                println!("{}{}", name, if user_defined { " (user)" } else { "" });
            }
        }

        Command::Toggle { unit } => {
            let master = graph.master_mut();
            let new_state = match unit {
                Unit::Master => master.toggle_state(),
                Unit::Eq => master.eq_mut().toggle_state(),
                Unit::Pitch => master.pitch_mut().toggle_state(),
                Unit::Time => master.time_mut().toggle_state(),
                Unit::Reverb => master.reverb_mut().toggle_state(),
                Unit::Delay => master.delay_mut().toggle_state(),
                Unit::Filter => master.filter_mut().toggle_state(),
            };
            println!("{}", new_state);
            store.save(&graph.persistent_state()).await?;
        }

        Command::Apply { unit, preset } => {
            let master = graph.master_mut();
            match unit {
                Unit::Master => apply_named(master, &preset)?,
                Unit::Eq => apply_named(master.eq_mut(), &preset)?,
                Unit::Pitch => apply_named(master.pitch_mut(), &preset)?,
                Unit::Time => apply_named(master.time_mut(), &preset)?,
                Unit::Reverb => apply_named(master.reverb_mut(), &preset)?,
                Unit::Delay => apply_named(master.delay_mut(), &preset)?,
                Unit::Filter => apply_named(master.filter_mut(), &preset)?,
            }
            store.save(&graph.persistent_state()).await?;
        }

        Command::Volume { level } => {
            println!("{:.2}", change_volume(&mut graph, level, &config));
            store.save(&graph.persistent_state()).await?;
        }

        Command::Pan { position } => {
            println!("{:+.2}", change_pan(&mut graph, position, &config));
            store.save(&graph.persistent_state()).await?;
        }

        Command::Profiles => {
            let profiles = graph.master().sound_profiles();
            if profiles.is_empty() {
                println!("No sound profiles");
            }
            for profile in profiles.iter() {
                println!(
                    "{}  volume {:.2}, pan {:+.2}",
                    profile.file.display(),
                    profile.volume,
                    profile.pan
                );
            }
        }

        Command::ForgetProfile { file } => {
            if !graph.forget_sound_profile(&file) {
                anyhow::bail!("no sound profile for {}", file.display());
            }
            store.save(&graph.persistent_state()).await?;
        }

        Command::Reset => {
            store.clear().await?;
            println!("State cleared: {}", store.state_path().display());
        }

        #[cfg(feature = "cpal")]
        Command::Devices => {
            use cadenza_core::domain::audio::AudioEnumerator;
            use cadenza_infra::audio::CpalEnumerator;

            let enumerator = CpalEnumerator::new();
            for device in enumerator.output_devices()? {
                let current = graph.output_device() == Some(&device.id);
                println!(
                    "{}{}{}",
                    device.name,
                    if device.is_default { " (default)" } else { "" },
                    if current { " *" } else { "" }
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> AudioGraph {
        AudioGraph::new(Arc::new(AudioUnitRegistry::new()))
    }

    #[test]
    fn test_parse_volume_and_pan_args() {
        let cli = Cli::try_parse_from(["cadenza", "volume", "up"]).unwrap();
        assert!(matches!(cli.command, Command::Volume { level: VolumeArg::Up }));

        let cli = Cli::try_parse_from(["cadenza", "volume", "0.3"]).unwrap();
        assert!(matches!(cli.command, Command::Volume { level: VolumeArg::Level(v) } if v == 0.3));

        let cli = Cli::try_parse_from(["cadenza", "pan", "-0.5"]).unwrap();
        assert!(matches!(cli.command, Command::Pan { position: PanArg::Position(p) } if p == -0.5));

        assert!(Cli::try_parse_from(["cadenza", "pan", "center"]).is_err());
    }

    #[test]
    fn test_steps_use_configured_amounts() {
        let config = AppConfig {
            volume_step: 0.2,
            pan_step: 0.25,
            ..AppConfig::default()
        };
        let mut graph = graph();

        assert!((change_volume(&mut graph, VolumeArg::Up, &config) - 0.7).abs() < 0.0001);
        assert!((change_volume(&mut graph, VolumeArg::Up, &config) - 0.9).abs() < 0.0001);
        assert_eq!(change_volume(&mut graph, VolumeArg::Up, &config), 1.0);
        assert!((change_volume(&mut graph, VolumeArg::Down, &config) - 0.8).abs() < 0.0001);

        assert_eq!(change_pan(&mut graph, PanArg::Left, &config), -0.25);
        assert_eq!(change_pan(&mut graph, PanArg::Right, &config), 0.0);
        assert_eq!(change_pan(&mut graph, PanArg::Position(-3.0), &config), -1.0);
    }
}
