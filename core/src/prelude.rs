use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use crate::layout::{CoordinateIndex, LayoutState, ProbeLayout};
pub use crate::math::neighbors::NeighborBackend;

/// External channel identifier, drawn from a layout's `channel_map`.
pub type ChannelId = u32;

/// Channels excluded from sorting ("bad channels").
pub type ExclusionSet = BTreeSet<ChannelId>;

/// Default horizontal template spacing, in layout units.
pub const DEFAULT_DMINX: f64 = 32.0;

/// Default number of nearest channels searched per template position.
pub const DEFAULT_NEAREST_CHANNELS: usize = 10;

/// Default radius for resolving a click to a channel spot.
pub const DEFAULT_CLICK_TOLERANCE: f64 = 0.5;

/// Common error type for layout and grid operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("duplicate channel coordinate ({x}, {y}) at electrodes {first} and {second}")]
    DuplicateCoordinate {
        x: f64,
        y: f64,
        first: usize,
        second: usize,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("settings unavailable: {0}")]
    Settings(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Compute device requested for nearest-neighbor searches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Cpu,
    Parallel,
}

/// How the coarse horizontal center grid is seeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum XCenters {
    /// Number of horizontal centers to fit.
    Count(usize),
    /// Initial guesses for the horizontal centers.
    Positions(Vec<f64>),
}

/// Per-run template parameters supplied by the settings collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateArgs {
    pub n_nearest: usize,
    pub dmin: Option<f64>,
    pub dminx: Option<f64>,
    pub max_channel_distance: Option<f64>,
    pub x_centers: Option<XCenters>,
    pub device: ComputeDevice,
}

impl Default for TemplateArgs {
    fn default() -> Self {
        Self {
            n_nearest: DEFAULT_NEAREST_CHANNELS,
            dmin: None,
            dminx: Some(DEFAULT_DMINX),
            max_channel_distance: None,
            x_centers: None,
            device: ComputeDevice::Cpu,
        }
    }
}

/// Spot size multiplier, quantized to quarter steps in `[0, 10]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(from = "u8", into = "u8")]
pub struct SpotScale(u8);

impl SpotScale {
    pub const MAX_STEPS: u8 = 40;

    /// Builds a scale from raw quarter steps, clamped to `0..=40`.
    pub fn from_steps(steps: u8) -> Self {
        Self(steps.min(Self::MAX_STEPS))
    }

    /// Quantizes a user-facing value to the nearest 0.25 within `[0, 10]`.
    pub fn from_value(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self(0);
        }
        let steps = (value * 4.0).round().min(Self::MAX_STEPS as f64);
        Self(steps as u8)
    }

    pub fn steps(self) -> u8 {
        self.0
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 4.0
    }

    /// Size of a spot with the given base size at this scale.
    pub fn apply(self, base: f64) -> f64 {
        base * self.0 as f64 / 4.0
    }
}

impl From<u8> for SpotScale {
    fn from(steps: u8) -> Self {
        Self::from_steps(steps)
    }
}

impl From<SpotScale> for u8 {
    fn from(scale: SpotScale) -> Self {
        scale.0
    }
}

impl Default for SpotScale {
    fn default() -> Self {
        Self(4)
    }
}

/// Presentation toggles that gate which derived collections are computed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayParams {
    pub show_template_grid: bool,
    pub show_centers: bool,
    pub lock_aspect_ratio: bool,
    pub spot_scale: SpotScale,
}

impl DisplayParams {
    pub fn needs_grid(&self) -> bool {
        self.show_template_grid || self.show_centers
    }
}

/// Pipeline stage completion flags. Informational only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SortingStatus {
    pub preprocess: bool,
    pub spikesort: bool,
    pub export: bool,
}
