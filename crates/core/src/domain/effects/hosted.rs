//! Hosted third-party audio units
//!
//! Plugins are reached through two traits: [`AudioUnitHost`] finds and
//! instantiates components, and [`AudioUnitInstance`] is the live plugin.
//! A platform plugin API sits behind them in a real player; the in-process
//! [`AudioUnitRegistry`] implements them for tests and headless use.
//!
//! Parameters are opaque to the chain: a list of `(address, value)` pairs
//! that the host defines.

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::audio::{AudioError, Result};
use crate::domain::node::{ParamF32, ParamFlag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Four-character code identifying a component type or sub-type
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FourCc(u32);

impl FourCc {
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub const fn code(self) -> u32 {
        self.0
    }

    pub fn bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes() {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc('{}')", self)
    }
}

impl FromStr for FourCc {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| {
            AudioError::InvalidConfiguration(format!("four-character code expected, got '{}'", s))
        })?;
        Ok(Self::from_bytes(bytes))
    }
}

/// One host-defined parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioUnitParameter {
    pub address: u64,
    pub value: f32,
}

impl AudioUnitParameter {
    pub fn new(address: u64, value: f32) -> Self {
        Self { address, value }
    }
}

/// Descriptor of an installed plugin component
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUnitComponent {
    pub component_type: FourCc,
    pub component_sub_type: FourCc,
    pub name: String,
    pub version: String,
    pub manufacturer_name: String,
}

/// Discovers and instantiates plugin components
pub trait AudioUnitHost: Send + Sync {
    /// Look up an installed component
    fn component(&self, component_type: FourCc, component_sub_type: FourCc) -> Option<AudioUnitComponent>;

    /// Create a live instance of `component`
    fn instantiate(&self, component: &AudioUnitComponent) -> Result<Box<dyn AudioUnitInstance>>;

    /// Every installed component
    fn components(&self) -> Vec<AudioUnitComponent>;
}

/// A live plugin instance, shared with the render thread
pub trait AudioUnitInstance: Send + Sync {
    fn set_bypass(&self, bypass: bool);

    fn is_bypassed(&self) -> bool;

    fn parameters(&self) -> Vec<AudioUnitParameter>;

    /// Write one parameter. Returns false when the address is unknown.
    fn set_parameter(&self, address: u64, value: f32) -> bool;
}

// ============================================================================
// IN-PROCESS HOST
// ============================================================================

/// Parameter storage of an in-process instance, one atomic slot per address
pub struct ParameterBlock {
    bypass: ParamFlag,
    addresses: Box<[u64]>,
    values: Box<[ParamF32]>,
}

impl ParameterBlock {
    pub fn new(parameters: &[AudioUnitParameter]) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            addresses: parameters.iter().map(|p| p.address).collect(),
            values: parameters.iter().map(|p| ParamF32::new(p.value)).collect(),
        }
    }

    fn slot(&self, address: u64) -> Option<&ParamF32> {
        self.addresses
            .iter()
            .position(|&a| a == address)
            .map(|index| &self.values[index])
    }
}

impl AudioUnitInstance for ParameterBlock {
    fn set_bypass(&self, bypass: bool) {
        self.bypass.set(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.bypass.get()
    }

    fn parameters(&self) -> Vec<AudioUnitParameter> {
        self.addresses
            .iter()
            .zip(self.values.iter())
            .map(|(&address, value)| AudioUnitParameter::new(address, value.get()))
            .collect()
    }

    fn set_parameter(&self, address: u64, value: f32) -> bool {
        match self.slot(address) {
            Some(slot) => {
                slot.set(value);
                true
            }
            None => false,
        }
    }
}

/// In-process [`AudioUnitHost`] with explicitly registered components
#[derive(Debug, Default)]
pub struct AudioUnitRegistry {
    components: Vec<(AudioUnitComponent, Vec<AudioUnitParameter>)>,
}

impl AudioUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with its default parameter table
    pub fn register(&mut self, component: AudioUnitComponent, defaults: Vec<AudioUnitParameter>) {
        debug!(
            "Registered audio unit {}/{} ({})",
            component.component_type, component.component_sub_type, component.name
        );
        self.unregister(component.component_type, component.component_sub_type);
        self.components.push((component, defaults));
    }

    pub fn unregister(&mut self, component_type: FourCc, component_sub_type: FourCc) {
        self.components.retain(|(c, _)| {
            !(c.component_type == component_type && c.component_sub_type == component_sub_type)
        });
    }

    fn entry(&self, component_type: FourCc, component_sub_type: FourCc) -> Option<&(AudioUnitComponent, Vec<AudioUnitParameter>)> {
        self.components.iter().find(|(c, _)| {
            c.component_type == component_type && c.component_sub_type == component_sub_type
        })
    }
}

impl AudioUnitHost for AudioUnitRegistry {
    fn component(&self, component_type: FourCc, component_sub_type: FourCc) -> Option<AudioUnitComponent> {
        self.entry(component_type, component_sub_type)
            .map(|(component, _)| component.clone())
    }

    fn instantiate(&self, component: &AudioUnitComponent) -> Result<Box<dyn AudioUnitInstance>> {
        let (_, defaults) = self
            .entry(component.component_type, component.component_sub_type)
            .ok_or_else(|| {
                AudioError::InstantiationFailed(format!(
                    "{} is not registered with this host",
                    component.name
                ))
            })?;
        Ok(Box::new(ParameterBlock::new(defaults)))
    }

    fn components(&self) -> Vec<AudioUnitComponent> {
        self.components.iter().map(|(c, _)| c.clone()).collect()
    }
}

// ============================================================================
// HOSTED UNIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedUnitPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    pub component_type: FourCc,
    pub component_sub_type: FourCc,
    #[serde(default)]
    pub params: Vec<AudioUnitParameter>,
}

impl_effects_unit_preset!(HostedUnitPreset);

/// One plugin instance in the chain
pub struct HostedAudioUnit {
    component: AudioUnitComponent,
    state: EffectsUnitState,
    instance: Arc<dyn AudioUnitInstance>,
    presets: PresetStore<HostedUnitPreset>,
}

impl fmt::Debug for HostedAudioUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedAudioUnit")
            .field("component", &self.component)
            .field("state", &self.state)
            .field("presets", &self.presets.user_defined_count())
            .finish()
    }
}

impl HostedAudioUnit {
    /// Wrap a live instance, restoring saved parameters and state
    pub fn new(
        component: AudioUnitComponent,
        instance: Box<dyn AudioUnitInstance>,
        state: EffectsUnitState,
        params: &[AudioUnitParameter],
        user_presets: Vec<HostedUnitPreset>,
    ) -> Self {
        let instance: Arc<dyn AudioUnitInstance> = Arc::from(instance);
        for param in params {
            instance.set_parameter(param.address, param.value);
        }
        instance.set_bypass(state.node_bypass());

        Self {
            component,
            state,
            instance,
            presets: PresetStore::with_user_presets(user_presets),
        }
    }

    pub fn component(&self) -> &AudioUnitComponent {
        &self.component
    }

    pub fn component_type(&self) -> FourCc {
        self.component.component_type
    }

    pub fn component_sub_type(&self) -> FourCc {
        self.component.component_sub_type
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn version(&self) -> &str {
        &self.component.version
    }

    pub fn manufacturer_name(&self) -> &str {
        &self.component.manufacturer_name
    }

    /// Shared handle for the render thread
    pub fn instance(&self) -> &Arc<dyn AudioUnitInstance> {
        &self.instance
    }

    pub fn parameters(&self) -> Vec<AudioUnitParameter> {
        self.instance.parameters()
    }

    pub fn set_parameter(&mut self, address: u64, value: f32) -> bool {
        let known = self.instance.set_parameter(address, value);
        trace!("{} parameter {} set to {} (known: {})", self.name(), address, value, known);
        known
    }
}

impl EffectsUnit for HostedAudioUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Hosted
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.instance.set_bypass(state.node_bypass());
    }
}

impl PresetUnit for HostedAudioUnit {
    type Preset = HostedUnitPreset;

    fn presets(&self) -> &PresetStore<HostedUnitPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<HostedUnitPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> HostedUnitPreset {
        HostedUnitPreset {
            name: format!("{} settings", self.name()),
            state: self.state,
            user_defined: false,
            component_type: self.component_type(),
            component_sub_type: self.component_sub_type(),
            params: self.parameters(),
        }
    }

    fn apply_preset(&mut self, preset: &HostedUnitPreset) {
        for param in &preset.params {
            self.instance.set_parameter(param.address, param.value);
        }
        debug!("{} applied {} parameters", self.name(), preset.params.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_component(sub_type: &str) -> AudioUnitComponent {
        AudioUnitComponent {
            component_type: "aufx".parse().unwrap(),
            component_sub_type: sub_type.parse().unwrap(),
            name: format!("Test {}", sub_type),
            version: "1.0.0".to_string(),
            manufacturer_name: "Cadenza".to_string(),
        }
    }

    fn registry() -> AudioUnitRegistry {
        let mut registry = AudioUnitRegistry::new();
        registry.register(
            test_component("dist"),
            vec![AudioUnitParameter::new(0, 0.5), AudioUnitParameter::new(7, -3.0)],
        );
        registry
    }

    #[test]
    fn test_four_cc() {
        let code: FourCc = "aufx".parse().unwrap();
        assert_eq!(code.code(), 0x6175_6678);
        assert_eq!(code.to_string(), "aufx");
        assert!("toolong".parse::<FourCc>().is_err());
        assert_eq!(FourCc::new(0x0000_0041).to_string(), "???A");
    }

    #[test]
    fn test_registry_lookup_and_instantiate() {
        let registry = registry();
        let aufx: FourCc = "aufx".parse().unwrap();
        let component = registry.component(aufx, "dist".parse().unwrap()).unwrap();
        assert_eq!(component.name, "Test dist");
        assert!(registry.component(aufx, "none".parse().unwrap()).is_none());

        let instance = registry.instantiate(&component).unwrap();
        assert!(instance.is_bypassed());
        assert_eq!(instance.parameters().len(), 2);

        let missing = registry.instantiate(&test_component("gone"));
        assert!(matches!(missing, Err(AudioError::InstantiationFailed(_))));
    }

    #[test]
    fn test_hosted_unit_state_and_params() {
        let registry = registry();
        let component = registry.components().remove(0);
        let instance = registry.instantiate(&component).unwrap();

        let mut unit = HostedAudioUnit::new(
            component,
            instance,
            EffectsUnitState::Active,
            &[AudioUnitParameter::new(7, 1.5)],
            Vec::new(),
        );
        assert!(!unit.instance().is_bypassed());
        assert_eq!(unit.parameters()[1], AudioUnitParameter::new(7, 1.5));
        assert!(!unit.set_parameter(99, 1.0));

        unit.toggle_state();
        assert!(unit.instance().is_bypassed());
    }

    #[test]
    fn test_hosted_preset_round_trip() {
        let registry = registry();
        let component = registry.components().remove(0);
        let instance = registry.instantiate(&component).unwrap();
        let mut unit =
            HostedAudioUnit::new(component, instance, EffectsUnitState::Bypassed, &[], Vec::new());

        unit.set_parameter(0, 0.9);
        unit.save_preset("Crunch");
        unit.set_parameter(0, 0.1);

        assert!(unit.apply_preset_named("Crunch"));
        assert!((unit.parameters()[0].value - 0.9).abs() < 0.001);
        assert_eq!(unit.state(), EffectsUnitState::Bypassed);
    }
}
