pub mod index;
pub mod probe;
pub mod state;

pub use index::CoordinateIndex;
pub use probe::ProbeLayout;
pub use state::LayoutState;
