pub mod kmeans;
pub mod neighbors;
pub mod stats;

pub use kmeans::KMeans1d;
pub use neighbors::{backend_for, CpuBackend, NearestChannels, NeighborBackend};
pub use stats::StatsHelper;

#[cfg(feature = "parallel")]
pub use neighbors::ParallelBackend;
