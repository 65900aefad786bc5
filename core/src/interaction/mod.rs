pub mod controller;
pub mod settings;

pub use controller::{ProbeView, ToggleOutcome};
pub use settings::{InMemorySettings, SettingsSource};
