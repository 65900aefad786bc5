pub mod spots;

pub use spots::{project_scene, Color, ProbeScene, SpotDescriptor, Symbol};
