//! Render-node proxies shared with the real-time render thread
//!
//! Each effects unit owns one (TimeStretch: two) of these nodes behind an
//! [`Arc`](std::sync::Arc). The controller thread writes parameters, the render thread reads
//! them on every callback. There are no locks: every parameter is its own
//! atomic cell, padded to a cache line so that neighbouring parameters do not
//! false-share between cores.
//!
//! Writes use `Release` and reads use `Acquire`, so a render callback that
//! observes a bypass flag also observes every parameter written before it.

use atomic_float::{AtomicF32, AtomicF64};
use crossbeam::utils::CachePadded;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Atomic f32 parameter
pub struct ParamF32(CachePadded<AtomicF32>);

impl ParamF32 {
    pub fn new(value: f32) -> Self {
        Self(CachePadded::new(AtomicF32::new(value)))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value, Ordering::Release);
    }
}

impl fmt::Debug for ParamF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Atomic f64 parameter
pub struct ParamF64(CachePadded<AtomicF64>);

impl ParamF64 {
    pub fn new(value: f64) -> Self {
        Self(CachePadded::new(AtomicF64::new(value)))
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value, Ordering::Release);
    }
}

impl fmt::Debug for ParamF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Atomic boolean parameter (bypass, mute)
pub struct ParamFlag(CachePadded<AtomicBool>);

impl ParamFlag {
    pub fn new(value: bool) -> Self {
        Self(CachePadded::new(AtomicBool::new(value)))
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}

impl fmt::Debug for ParamFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Atomic small enum parameter, stored as its discriminant
pub struct ParamIndex(CachePadded<AtomicU8>);

impl ParamIndex {
    pub fn new(value: u8) -> Self {
        Self(CachePadded::new(AtomicU8::new(value)))
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: u8) {
        self.0.store(value, Ordering::Release);
    }
}

impl fmt::Debug for ParamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

// ============================================================================
// EFFECT NODES
// ============================================================================

/// Band-gain equalizer node
#[derive(Debug)]
pub struct EqNode {
    pub bypass: ParamFlag,
    pub global_gain: ParamF32,
    band_gains: Box<[ParamF32]>,
}

impl EqNode {
    pub fn new(band_count: usize) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            global_gain: ParamF32::new(0.0),
            band_gains: (0..band_count).map(|_| ParamF32::new(0.0)).collect(),
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_gains.len()
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.band_gains.get(index).map(ParamF32::get)
    }

    pub fn set_band_gain(&self, index: usize, gain: f32) {
        if let Some(band) = self.band_gains.get(index) {
            band.set(gain);
        }
    }

    /// Copy all band gains into `out` (no allocation on the render thread)
    pub fn read_band_gains(&self, out: &mut [f32]) {
        for (dst, src) in out.iter_mut().zip(self.band_gains.iter()) {
            *dst = src.get();
        }
    }

    pub fn band_gains(&self) -> Vec<f32> {
        self.band_gains.iter().map(ParamF32::get).collect()
    }
}

/// Pitch shifting node (pitch in cents)
#[derive(Debug)]
pub struct PitchShiftNode {
    pub bypass: ParamFlag,
    pub pitch: ParamF32,
    pub overlap: ParamF32,
}

impl PitchShiftNode {
    pub fn new(pitch: f32, overlap: f32) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            pitch: ParamF32::new(pitch),
            overlap: ParamF32::new(overlap),
        }
    }
}

/// Resampling node: changes rate and pitch together
#[derive(Debug)]
pub struct VarispeedNode {
    pub bypass: ParamFlag,
    pub rate: ParamF32,
}

/// Time-stretching node: changes rate while preserving pitch
#[derive(Debug)]
pub struct TimePitchNode {
    pub bypass: ParamFlag,
    pub rate: ParamF32,
    pub overlap: ParamF32,
}

/// Pair of nodes behind the time stretch unit; at most one is un-bypassed
#[derive(Debug)]
pub struct TimeStretchNode {
    pub varispeed: VarispeedNode,
    pub time_pitch: TimePitchNode,
}

impl TimeStretchNode {
    pub fn new(rate: f32, overlap: f32) -> Self {
        Self {
            varispeed: VarispeedNode {
                bypass: ParamFlag::new(true),
                rate: ParamF32::new(rate),
            },
            time_pitch: TimePitchNode {
                bypass: ParamFlag::new(true),
                rate: ParamF32::new(rate),
                overlap: ParamF32::new(overlap),
            },
        }
    }

    /// True when neither node processes audio
    pub fn bypass(&self) -> bool {
        self.varispeed.bypass.get() && self.time_pitch.bypass.get()
    }
}

/// Reverb node
#[derive(Debug)]
pub struct ReverbNode {
    pub bypass: ParamFlag,
    pub wet_dry_mix: ParamF32,
    /// Index of the factory room preset loaded in the node
    pub space: ParamIndex,
}

impl ReverbNode {
    pub fn new(space: u8, wet_dry_mix: f32) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            wet_dry_mix: ParamF32::new(wet_dry_mix),
            space: ParamIndex::new(space),
        }
    }
}

/// Delay node
#[derive(Debug)]
pub struct DelayNode {
    pub bypass: ParamFlag,
    pub wet_dry_mix: ParamF32,
    pub delay_time: ParamF64,
    pub feedback: ParamF32,
    pub low_pass_cutoff: ParamF32,
}

impl DelayNode {
    pub fn new(wet_dry_mix: f32, delay_time: f64, feedback: f32, low_pass_cutoff: f32) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            wet_dry_mix: ParamF32::new(wet_dry_mix),
            delay_time: ParamF64::new(delay_time),
            feedback: ParamF32::new(feedback),
            low_pass_cutoff: ParamF32::new(low_pass_cutoff),
        }
    }
}

/// Filter shape loaded into one slot of the filter node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterSlotType {
    LowPass = 0,
    HighPass = 1,
    BandPass = 2,
    /// Peaking filter; band-stop is a parametric slot with a deep cut
    Parametric = 3,
}

impl FilterSlotType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => FilterSlotType::LowPass,
            1 => FilterSlotType::HighPass,
            2 => FilterSlotType::BandPass,
            _ => FilterSlotType::Parametric,
        }
    }
}

/// One band slot of the filter node
#[derive(Debug)]
pub struct FilterSlot {
    pub bypass: ParamFlag,
    pub filter_type: ParamIndex,
    pub frequency: ParamF32,
    /// Bandwidth in octaves
    pub bandwidth: ParamF32,
    pub gain: ParamF32,
}

impl FilterSlot {
    fn new() -> Self {
        Self {
            bypass: ParamFlag::new(true),
            filter_type: ParamIndex::new(FilterSlotType::Parametric as u8),
            frequency: ParamF32::new(1000.0),
            bandwidth: ParamF32::new(0.5),
            gain: ParamF32::new(0.0),
        }
    }

    pub fn slot_type(&self) -> FilterSlotType {
        FilterSlotType::from_u8(self.filter_type.get())
    }
}

/// Multi-band filter node with a fixed pool of band slots
#[derive(Debug)]
pub struct FilterNode {
    pub bypass: ParamFlag,
    slots: Box<[FilterSlot]>,
    active_bands: CachePadded<AtomicUsize>,
}

impl FilterNode {
    pub fn new(slot_count: usize) -> Self {
        Self {
            bypass: ParamFlag::new(true),
            slots: (0..slot_count).map(|_| FilterSlot::new()).collect(),
            active_bands: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&FilterSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[FilterSlot] {
        &self.slots
    }

    pub fn active_bands(&self) -> usize {
        self.active_bands.load(Ordering::Acquire)
    }

    pub fn set_active_bands(&self, count: usize) {
        self.active_bands
            .store(count.min(self.slots.len()), Ordering::Release);
    }
}

// ============================================================================
// CHAIN NODES
// ============================================================================

/// Master override flag layered over every child unit's own bypass
#[derive(Debug)]
pub struct MasterNode {
    pub bypass: ParamFlag,
}

impl MasterNode {
    pub fn new(bypass: bool) -> Self {
        Self {
            bypass: ParamFlag::new(bypass),
        }
    }
}

/// Player/output gain stage
///
/// `gain` is what the render thread multiplies by. It equals `volume`, or 0
/// while muted; the stored `volume` is never touched by muting.
#[derive(Debug)]
pub struct OutputNode {
    volume: ParamF32,
    pan: ParamF32,
    muted: ParamFlag,
    gain: ParamF32,
}

impl OutputNode {
    pub fn new(volume: f32, pan: f32, muted: bool) -> Self {
        Self {
            volume: ParamF32::new(volume),
            pan: ParamF32::new(pan),
            muted: ParamFlag::new(muted),
            gain: ParamF32::new(if muted { 0.0 } else { volume }),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
        if !self.muted.get() {
            self.gain.set(volume);
        }
    }

    pub fn pan(&self) -> f32 {
        self.pan.get()
    }

    pub fn set_pan(&self, pan: f32) {
        self.pan.set(pan);
    }

    pub fn muted(&self) -> bool {
        self.muted.get()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
        self.gain.set(if muted { 0.0 } else { self.volume.get() });
    }

    /// Gain actually applied to the signal
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_param_cells() {
        let gain = ParamF32::new(0.25);
        assert_eq!(gain.get(), 0.25);
        gain.set(-3.5);
        assert_eq!(gain.get(), -3.5);

        let time = ParamF64::new(1.0);
        time.set(0.125);
        assert_eq!(time.get(), 0.125);

        let flag = ParamFlag::new(true);
        flag.set(false);
        assert!(!flag.get());
    }

    #[test]
    fn test_eq_node_bands() {
        let node = EqNode::new(10);
        assert_eq!(node.band_count(), 10);

        node.set_band_gain(3, 6.0);
        node.set_band_gain(42, 1.0); // out of range: ignored

        assert_eq!(node.band_gain(3), Some(6.0));
        assert_eq!(node.band_gain(42), None);

        let mut gains = [0.0_f32; 10];
        node.read_band_gains(&mut gains);
        assert_eq!(gains[3], 6.0);
        assert_eq!(node.band_gains(), gains.to_vec());
    }

    #[test]
    fn test_output_node_mute_keeps_volume() {
        let node = OutputNode::new(0.7, 0.0, false);
        assert_eq!(node.gain(), 0.7);

        node.set_muted(true);
        assert_eq!(node.volume(), 0.7);
        assert_eq!(node.gain(), 0.0);

        // Volume changes while muted are remembered but stay silent
        node.set_volume(0.4);
        assert_eq!(node.gain(), 0.0);

        node.set_muted(false);
        assert_eq!(node.gain(), 0.4);
    }

    #[test]
    fn test_filter_node_active_bands_clamped() {
        let node = FilterNode::new(4);
        node.set_active_bands(10);
        assert_eq!(node.active_bands(), 4);
        assert_eq!(node.slot(0).unwrap().slot_type(), FilterSlotType::Parametric);
    }

    #[test]
    fn test_cross_thread_visibility() {
        let node = Arc::new(DelayNode::new(50.0, 1.0, 0.0, 15000.0));
        let writer = Arc::clone(&node);

        let handle = thread::spawn(move || {
            writer.delay_time.set(0.5);
            writer.bypass.set(false);
        });
        handle.join().unwrap();

        assert!(!node.bypass.get());
        assert_eq!(node.delay_time.get(), 0.5);
    }
}
