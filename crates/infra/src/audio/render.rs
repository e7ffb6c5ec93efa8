//! Render-thread side of the effects chain
//!
//! The controller thread owns the units; the render callback only ever sees
//! [`RenderHandles`]. A [`ChainReader`] turns them into a [`ChainSnapshot`]
//! once per callback and an [`OutputStage`] applies the player gain and pan.
//!
//! Nothing here allocates or locks on the hot path. When the set of hosted
//! units changes, the controller publishes fresh handles through a
//! [`HandleUpdates`] channel; the reader swaps them in between callbacks and
//! sends the retired set back so it is dropped on the controller thread.
//! Both directions hold a single set. The reader only swaps while the retire
//! slot is empty, so a retired set is never dropped on the render thread.

use cadenza_core::domain::effects::EqType;
use cadenza_core::domain::graph::RenderHandles;
use cadenza_core::domain::node::OutputNode;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Largest equalizer layout
pub const MAX_EQ_BANDS: usize = 15;

/// Per-callback view of every parameter in the chain
///
/// `*_active` flags already include the master override: a unit is active
/// only when both it and the master are un-bypassed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSnapshot {
    pub master_active: bool,

    pub eq_active: bool,
    pub eq_global_gain: f32,
    pub eq_band_count: usize,
    pub eq_gains: [f32; MAX_EQ_BANDS],

    pub pitch_active: bool,
    pub pitch_cents: f32,
    pub pitch_overlap: f32,

    pub varispeed_active: bool,
    pub time_pitch_active: bool,
    pub rate: f32,
    pub time_overlap: f32,

    pub reverb_active: bool,
    pub reverb_space: u8,
    pub reverb_mix: f32,

    pub delay_active: bool,
    pub delay_mix: f32,
    pub delay_time: f64,
    pub delay_feedback: f32,
    pub delay_cutoff: f32,

    pub filter_active: bool,
    pub filter_bands: usize,

    pub hosted_active: usize,

    pub gain: f32,
    pub pan: f32,
}

impl Default for ChainSnapshot {
    fn default() -> Self {
        Self {
            master_active: false,
            eq_active: false,
            eq_global_gain: 0.0,
            eq_band_count: EqType::default().band_count(),
            eq_gains: [0.0; MAX_EQ_BANDS],
            pitch_active: false,
            pitch_cents: 0.0,
            pitch_overlap: 0.0,
            varispeed_active: false,
            time_pitch_active: false,
            rate: 1.0,
            time_overlap: 0.0,
            reverb_active: false,
            reverb_space: 0,
            reverb_mix: 0.0,
            delay_active: false,
            delay_mix: 0.0,
            delay_time: 0.0,
            delay_feedback: 0.0,
            delay_cutoff: 0.0,
            filter_active: false,
            filter_bands: 0,
            hosted_active: 0,
            gain: 0.0,
            pan: 0.0,
        }
    }
}

impl ChainSnapshot {
    /// Number of native units that will process audio
    pub fn active_native_units(&self) -> usize {
        [
            self.eq_active,
            self.pitch_active,
            self.varispeed_active || self.time_pitch_active,
            self.reverb_active,
            self.delay_active,
            self.filter_active,
        ]
        .iter()
        .filter(|&&active| active)
        .count()
    }
}

/// Controller side of the handle channel
pub struct HandleUpdates {
    tx: Sender<RenderHandles>,
    retired: Receiver<RenderHandles>,
}

impl HandleUpdates {
    /// Publish a new set of handles. Returns false when an earlier update is
    /// still pending.
    pub fn publish(&self, handles: RenderHandles) -> bool {
        let collected = self.collect_retired();
        if collected > 0 {
            trace!("Collected {} retired handle set(s)", collected);
        }
        match self.tx.try_send(handles) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Render handle update dropped: previous update not yet consumed");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Drop handle sets the render thread has finished with
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }
}

/// Reads the chain's render nodes once per callback
pub struct ChainReader {
    handles: RenderHandles,
    updates: Option<(Receiver<RenderHandles>, Sender<RenderHandles>)>,
}

impl ChainReader {
    pub fn new(handles: RenderHandles) -> Self {
        Self {
            handles,
            updates: None,
        }
    }

    /// Reader plus the channel the controller uses to replace its handles
    pub fn with_updates(handles: RenderHandles) -> (Self, HandleUpdates) {
        let (tx, rx) = channel::bounded(1);
        let (retired_tx, retired_rx) = channel::bounded(1);

        let reader = Self {
            handles,
            updates: Some((rx, retired_tx)),
        };
        (
            reader,
            HandleUpdates {
                tx,
                retired: retired_rx,
            },
        )
    }

    pub fn handles(&self) -> &RenderHandles {
        &self.handles
    }

    /// Swap in handles published since the last call; true when swapped.
    /// Skips the swap while the previous retired set is still uncollected.
    pub fn poll_updates(&mut self) -> bool {
        let Some((rx, retired)) = &self.updates else {
            return false;
        };

        // The update stays queued until the last retired set is collected
        if retired.is_full() {
            return false;
        }

        match rx.try_recv() {
            Ok(handles) => {
                let old = std::mem::replace(&mut self.handles, handles);
                // Cannot be full here; fails only once the controller is gone
                let _ = retired.try_send(old);
                debug!("Render handles replaced");
                true
            }
            Err(_) => false,
        }
    }

    /// Fill `out` with the current parameters
    pub fn snapshot_into(&self, out: &mut ChainSnapshot) {
        let h = &self.handles;
        let master = !h.master.bypass.get();
        out.master_active = master;

        out.eq_active = master && !h.eq.bypass.get();
        out.eq_global_gain = h.eq.global_gain.get();
        out.eq_band_count = h.eq.band_count().min(MAX_EQ_BANDS);
        h.eq.read_band_gains(&mut out.eq_gains[..out.eq_band_count]);

        out.pitch_active = master && !h.pitch.bypass.get();
        out.pitch_cents = h.pitch.pitch.get();
        out.pitch_overlap = h.pitch.overlap.get();

        out.varispeed_active = master && !h.time.varispeed.bypass.get();
        out.time_pitch_active = master && !h.time.time_pitch.bypass.get();
        out.rate = if out.varispeed_active {
            h.time.varispeed.rate.get()
        } else if out.time_pitch_active {
            h.time.time_pitch.rate.get()
        } else {
            1.0
        };
        out.time_overlap = h.time.time_pitch.overlap.get();

        out.reverb_active = master && !h.reverb.bypass.get();
        out.reverb_space = h.reverb.space.get();
        out.reverb_mix = h.reverb.wet_dry_mix.get();

        out.delay_active = master && !h.delay.bypass.get();
        out.delay_mix = h.delay.wet_dry_mix.get();
        out.delay_time = h.delay.delay_time.get();
        out.delay_feedback = h.delay.feedback.get();
        out.delay_cutoff = h.delay.low_pass_cutoff.get();

        out.filter_active = master && !h.filter.bypass.get();
        out.filter_bands = h.filter.active_bands();

        out.hosted_active = if master {
            h.hosted.iter().filter(|unit| !unit.is_bypassed()).count()
        } else {
            0
        };

        out.gain = h.output.gain();
        out.pan = h.output.pan();
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        let mut snapshot = ChainSnapshot::default();
        self.snapshot_into(&mut snapshot);
        snapshot
    }
}

/// Applies player gain and constant-power pan to interleaved stereo audio
pub struct OutputStage {
    output: Arc<OutputNode>,
}

impl OutputStage {
    pub fn new(output: Arc<OutputNode>) -> Self {
        Self { output }
    }

    /// Left and right gains for the current volume, pan and mute
    pub fn channel_gains(&self) -> (f32, f32) {
        let gain = self.output.gain();
        let angle = (self.output.pan() + 1.0) * FRAC_PI_4;
        (gain * angle.cos(), gain * angle.sin())
    }

    /// Process an interleaved stereo buffer in place
    pub fn process(&self, buffer: &mut [f32]) {
        let (left, right) = self.channel_gains();
        for frame in buffer.chunks_exact_mut(2) {
            frame[0] *= left;
            frame[1] *= right;
        }
    }
}
