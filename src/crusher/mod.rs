//! Bit-depth quantization and sample-and-hold decimation.
//!
//! The transform is a plain function over a block plus one [`CrusherState`] per channel.
//! State survives between calls so the hold cycle runs continuously across block
//! boundaries, independent of how the host chunks the stream.

pub mod params;

pub use params::{CrusherParams, ParamUpdate, quantization_step};

/// Per-channel hold state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrusherState {
    phase: u64,
    held_sample: f32,
}

impl CrusherState {
    pub const fn new() -> Self {
        Self {
            phase: 0,
            held_sample: 0.0,
        }
    }

    pub const fn phase(&self) -> u64 {
        self.phase
    }

    pub const fn held_sample(&self) -> f32 {
        self.held_sample
    }

    pub const fn reset(&mut self) {
        self.phase = 0;
        self.held_sample = 0.0;
    }
}

/// Floors `input` onto the grid of multiples of `step`.
///
/// Truncation goes toward negative infinity, so anything in `(-step, 0)` lands on `-step`.
#[inline]
pub fn quantize(input: f32, step: f32) -> f32 {
    (input / step).floor() * step
}

/// Crushes one channel in place.
#[inline]
pub fn process_channel(samples: &mut [f32], params: CrusherParams, state: &mut CrusherState) {
    let step = params.step();
    let factor = u64::from(params.downsample());

    if factor <= 1 {
        for sample in samples.iter_mut() {
            *sample = quantize(*sample, step);
        }
        return;
    }

    for sample in samples.iter_mut() {
        if state.phase % factor == 0 {
            state.held_sample = quantize(*sample, step);
        }
        *sample = state.held_sample;
        state.phase = state.phase.wrapping_add(1);
    }
}

/// Crushes every channel of `block` with the same parameter snapshot.
///
/// `states` is index-aligned with the channels. A channel without a matching state is left
/// untouched rather than faulting the audio callback.
pub fn process_block<C: AsMut<[f32]>>(
    block: &mut [C],
    params: CrusherParams,
    states: &mut [CrusherState],
) {
    let params = params.clamped();
    for (channel, state) in block.iter_mut().zip(states.iter_mut()) {
        process_channel(channel.as_mut(), params, state);
    }
}

/// Owns the per-channel states for a fixed channel count.
#[derive(Debug, Clone, Default)]
pub struct Crusher {
    states: Vec<CrusherState>,
}

impl Crusher {
    pub fn new(channels: usize) -> Self {
        Self {
            states: vec![CrusherState::new(); channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[CrusherState] {
        &self.states
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    pub fn process<C: AsMut<[f32]>>(&mut self, block: &mut [C], params: CrusherParams) {
        process_block(block, params, &mut self.states);
    }
}
