use serde::{Deserialize, Serialize};

pub const MIN_BIT_DEPTH: u8 = 1;
pub const MAX_BIT_DEPTH: u8 = 16;
pub const DEFAULT_BIT_DEPTH: u8 = 8;

pub const MIN_DOWNSAMPLE: u8 = 1;
pub const MAX_DOWNSAMPLE: u8 = 20;
pub const DEFAULT_DOWNSAMPLE: u8 = 1;

/// A snapshot of the two crusher controls.
///
/// Values held here are always in range. Construct through [`CrusherParams::new`] or
/// [`CrusherParams::apply`] so raw host values get clamped on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawParams")]
pub struct CrusherParams {
    bit_depth: u8,
    downsample_factor: u8,
}

/// Wire form of [`CrusherParams`]. Any number is accepted and clamped on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParams {
    #[serde(default = "default_raw_bit_depth")]
    bit_depth: f32,
    #[serde(default = "default_raw_downsample", alias = "downsample")]
    downsample_factor: f32,
}

fn default_raw_bit_depth() -> f32 {
    f32::from(DEFAULT_BIT_DEPTH)
}

fn default_raw_downsample() -> f32 {
    f32::from(DEFAULT_DOWNSAMPLE)
}

impl From<RawParams> for CrusherParams {
    fn from(raw: RawParams) -> Self {
        Self::new(raw.bit_depth, raw.downsample_factor)
    }
}

impl Default for CrusherParams {
    fn default() -> Self {
        Self {
            bit_depth: DEFAULT_BIT_DEPTH,
            downsample_factor: DEFAULT_DOWNSAMPLE,
        }
    }
}

impl std::fmt::Display for CrusherParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} bit, downsample x{}",
            self.bit_depth, self.downsample_factor
        )
    }
}

impl CrusherParams {
    /// Builds a snapshot from raw host values, clamping both into range.
    pub fn new(bit_depth: f32, downsample: f32) -> Self {
        Self {
            bit_depth: clamp_control(bit_depth, MIN_BIT_DEPTH, MAX_BIT_DEPTH),
            downsample_factor: clamp_control(downsample, MIN_DOWNSAMPLE, MAX_DOWNSAMPLE),
        }
    }

    pub const fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub const fn downsample(&self) -> u8 {
        self.downsample_factor
    }

    /// Re-clamps a snapshot. A no-op for values built through `new`, `apply` or serde.
    pub fn clamped(self) -> Self {
        Self {
            bit_depth: self.bit_depth.clamp(MIN_BIT_DEPTH, MAX_BIT_DEPTH),
            downsample_factor: self.downsample_factor.clamp(MIN_DOWNSAMPLE, MAX_DOWNSAMPLE),
        }
    }

    /// Merges a partial update. Fields missing from `update` keep their current value.
    pub fn apply(self, update: &ParamUpdate) -> Self {
        Self {
            bit_depth: update.bit_depth.map_or(self.bit_depth, |v| {
                clamp_control(v, MIN_BIT_DEPTH, MAX_BIT_DEPTH)
            }),
            downsample_factor: update.downsample_factor.map_or(self.downsample_factor, |v| {
                clamp_control(v, MIN_DOWNSAMPLE, MAX_DOWNSAMPLE)
            }),
        }
    }

    /// Quantization step on the unit scale, `2^-bit_depth`.
    #[inline]
    pub fn step(&self) -> f32 {
        quantization_step(self.bit_depth)
    }
}

/// Partial parameter update as sent by a controller, e.g. `{"bitDepth": 4}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<f32>,
    #[serde(default, alias = "downsample", skip_serializing_if = "Option::is_none")]
    pub downsample_factor: Option<f32>,
}

impl ParamUpdate {
    pub const fn bit_depth(value: f32) -> Self {
        Self {
            bit_depth: Some(value),
            downsample_factor: None,
        }
    }

    pub const fn downsample(value: f32) -> Self {
        Self {
            bit_depth: None,
            downsample_factor: Some(value),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.bit_depth.is_none() && self.downsample_factor.is_none()
    }
}

/// `2^-bit_depth`. Exact in `f32` for every depth in range.
#[inline]
pub fn quantization_step(bit_depth: u8) -> f32 {
    0.5f32.powi(i32::from(bit_depth))
}

/// Clamps a raw control value into `[min, max]` and truncates it to an integer.
/// NaN maps to `min` so a bad automation value can never stall the audio side.
fn clamp_control(value: f32, min: u8, max: u8) -> u8 {
    if value.is_nan() {
        return min;
    }
    value.clamp(f32::from(min), f32::from(max)).floor() as u8
}
