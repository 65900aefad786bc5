//! Probe layout core for the Rust probe viewer.
//!
//! The modules cover the channel layout and its coordinate index, the
//! template-grid and grouping-center derivation shared with the sorting
//! pipeline, click-driven channel exclusion, and the projection of all of it
//! into point descriptors for an external plotting front end.

pub mod grid;
pub mod interaction;
pub mod layout;
pub mod math;
pub mod prelude;
pub mod render;
pub mod telemetry;

pub use interaction::{InMemorySettings, ProbeView, SettingsSource, ToggleOutcome};
pub use prelude::{
    ChannelId, ComputeDevice, DisplayParams, ExclusionSet, ProbeError, ProbeResult,
    SortingStatus, SpotScale, TemplateArgs, XCenters,
};
pub use render::{ProbeScene, SpotDescriptor};
