use crate::prelude::ComputeDevice;
use ndarray::Array2;
use std::cmp::Ordering;

/// Nearest-channel table for a set of query points.
///
/// Both arrays are shaped `(n_nearest, n_points)`: row `r` holds the
/// `r`-th closest channel of every point, so row 0 is the closest.
#[derive(Debug, Clone)]
pub struct NearestChannels {
    pub indices: Array2<usize>,
    pub sq_distances: Array2<f64>,
}

impl NearestChannels {
    pub fn empty(n_nearest: usize) -> Self {
        Self {
            indices: Array2::zeros((n_nearest, 0)),
            sq_distances: Array2::zeros((n_nearest, 0)),
        }
    }

    pub fn n_points(&self) -> usize {
        self.indices.ncols()
    }

    pub fn n_nearest(&self) -> usize {
        self.indices.nrows()
    }

    /// Squared distance from `point` to its closest channel.
    pub fn closest_sq_distance(&self, point: usize) -> Option<f64> {
        self.sq_distances.get((0, point)).copied()
    }

    /// Keeps only the listed point columns, in the given order.
    pub fn select_points(&self, points: &[usize]) -> Self {
        Self {
            indices: self.indices.select(ndarray::Axis(1), points),
            sq_distances: self.sq_distances.select(ndarray::Axis(1), points),
        }
    }

    fn from_columns(n_nearest: usize, columns: Vec<Vec<(usize, f64)>>) -> Self {
        let n_points = columns.len();
        let mut indices = Array2::zeros((n_nearest, n_points));
        let mut sq_distances = Array2::zeros((n_nearest, n_points));
        for (point, column) in columns.into_iter().enumerate() {
            for (rank, (channel, distance)) in column.into_iter().take(n_nearest).enumerate() {
                indices[[rank, point]] = channel;
                sq_distances[[rank, point]] = distance;
            }
        }
        Self {
            indices,
            sq_distances,
        }
    }
}

/// Strategy for the nearest-neighbor searches behind the grid derivation.
///
/// Implementations must be deterministic: equal distances resolve to the
/// lower channel or center index.
pub trait NeighborBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// The `n_nearest` closest channels (squared Euclidean distance) of every
    /// query point `(xs[i], ys[i])`.
    fn nearest_channels(
        &self,
        ys: &[f64],
        yc: &[f64],
        xs: &[f64],
        xc: &[f64],
        n_nearest: usize,
    ) -> NearestChannels;

    /// For every grid point, the index of the closest center of the
    /// `x_centers × y_centers` grid, numbered `row + column * y_centers.len()`.
    fn nearest_centers(
        &self,
        grid_x: &[f64],
        grid_y: &[f64],
        x_centers: &[f64],
        y_centers: &[f64],
    ) -> Vec<usize>;
}

fn by_distance_then_index(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

fn closest_channels(y: f64, x: f64, yc: &[f64], xc: &[f64]) -> Vec<(usize, f64)> {
    let mut column: Vec<(usize, f64)> = yc
        .iter()
        .zip(xc)
        .enumerate()
        .map(|(channel, (&cy, &cx))| (channel, (y - cy).powi(2) + (x - cx).powi(2)))
        .collect();
    column.sort_by(by_distance_then_index);
    column
}

fn closest_center(x: f64, y: f64, x_centers: &[f64], y_centers: &[f64]) -> usize {
    let rows = y_centers.len();
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (column, &cx) in x_centers.iter().enumerate() {
        for (row, &cy) in y_centers.iter().enumerate() {
            let distance = (x - cx).powi(2) + (y - cy).powi(2);
            if distance < best_distance {
                best_distance = distance;
                best = row + column * rows;
            }
        }
    }
    best
}

/// Single-threaded backend computing a dense channel-by-point distance matrix.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl NeighborBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn nearest_channels(
        &self,
        ys: &[f64],
        yc: &[f64],
        xs: &[f64],
        xc: &[f64],
        n_nearest: usize,
    ) -> NearestChannels {
        let n_chan = yc.len().min(xc.len());
        let n_points = ys.len().min(xs.len());
        let n_nearest = n_nearest.min(n_chan);
        if n_points == 0 || n_nearest == 0 {
            return NearestChannels::empty(n_nearest);
        }

        let distances = Array2::from_shape_fn((n_chan, n_points), |(c, p)| {
            (ys[p] - yc[c]).powi(2) + (xs[p] - xc[c]).powi(2)
        });
        let columns = distances
            .columns()
            .into_iter()
            .map(|column| {
                let mut ranked: Vec<(usize, f64)> = column.iter().copied().enumerate().collect();
                ranked.sort_by(by_distance_then_index);
                ranked
            })
            .collect();
        NearestChannels::from_columns(n_nearest, columns)
    }

    fn nearest_centers(
        &self,
        grid_x: &[f64],
        grid_y: &[f64],
        x_centers: &[f64],
        y_centers: &[f64],
    ) -> Vec<usize> {
        if x_centers.is_empty() || y_centers.is_empty() {
            return Vec::new();
        }
        grid_x
            .iter()
            .zip(grid_y)
            .map(|(&x, &y)| closest_center(x, y, x_centers, y_centers))
            .collect()
    }
}

/// Backend that fans the per-point searches out over the rayon pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelBackend;

#[cfg(feature = "parallel")]
impl NeighborBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn nearest_channels(
        &self,
        ys: &[f64],
        yc: &[f64],
        xs: &[f64],
        xc: &[f64],
        n_nearest: usize,
    ) -> NearestChannels {
        use rayon::prelude::*;

        let n_chan = yc.len().min(xc.len());
        let n_nearest = n_nearest.min(n_chan);
        if n_nearest == 0 {
            return NearestChannels::empty(0);
        }
        let columns: Vec<Vec<(usize, f64)>> = ys
            .par_iter()
            .zip(xs.par_iter())
            .map(|(&y, &x)| closest_channels(y, x, yc, xc))
            .collect();
        NearestChannels::from_columns(n_nearest, columns)
    }

    fn nearest_centers(
        &self,
        grid_x: &[f64],
        grid_y: &[f64],
        x_centers: &[f64],
        y_centers: &[f64],
    ) -> Vec<usize> {
        use rayon::prelude::*;

        if x_centers.is_empty() || y_centers.is_empty() {
            return Vec::new();
        }
        grid_x
            .par_iter()
            .zip(grid_y.par_iter())
            .map(|(&x, &y)| closest_center(x, y, x_centers, y_centers))
            .collect()
    }
}

static CPU: CpuBackend = CpuBackend;

#[cfg(feature = "parallel")]
static PARALLEL: ParallelBackend = ParallelBackend;

/// Resolves the backend for a requested device.
pub fn backend_for(device: ComputeDevice) -> &'static dyn NeighborBackend {
    match device {
        ComputeDevice::Cpu => &CPU,
        #[cfg(feature = "parallel")]
        ComputeDevice::Parallel => &PARALLEL,
        #[cfg(not(feature = "parallel"))]
        ComputeDevice::Parallel => {
            log::warn!("parallel backend not compiled in, falling back to cpu");
            &CPU
        }
    }
}

/// Single closest channel, for checking backend results.
#[cfg(test)]
pub(crate) fn brute_force_nearest(y: f64, x: f64, yc: &[f64], xc: &[f64]) -> Option<(usize, f64)> {
    closest_channels(y, x, yc, xc).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> (Vec<f64>, Vec<f64>) {
        (vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 0.0, 1.0])
    }

    #[test]
    fn cpu_backend_ranks_channels_by_distance() {
        let (xc, yc) = square();
        let result = CpuBackend.nearest_channels(&[0.9], &yc, &[0.1], &xc, 2);
        assert_eq!(result.n_nearest(), 2);
        assert_eq!(result.n_points(), 1);
        assert_eq!(result.indices[[0, 0]], 1);
        assert!((result.closest_sq_distance(0).unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn cpu_backend_clips_nearest_count_to_channels() {
        let (xc, yc) = square();
        let result = CpuBackend.nearest_channels(&[0.0, 5.0], &yc, &[0.0, 5.0], &xc, 10);
        assert_eq!(result.n_nearest(), 4);
        assert_eq!(result.n_points(), 2);
    }

    #[test]
    fn ties_resolve_to_lower_channel() {
        let (xc, yc) = square();
        let result = CpuBackend.nearest_channels(&[0.5], &yc, &[0.5], &xc, 4);
        let order: Vec<usize> = result.indices.column(0).to_vec();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn no_channels_yields_empty_table() {
        let result = CpuBackend.nearest_channels(&[1.0], &[], &[1.0], &[], 3);
        assert_eq!(result.n_points(), 0);
        assert_eq!(result.closest_sq_distance(0), None);
    }

    #[test]
    fn nearest_centers_use_column_major_numbering() {
        let x_centers = [0.0, 100.0];
        let y_centers = [0.0, 50.0, 100.0];
        let assigned = CpuBackend.nearest_centers(
            &[1.0, 99.0, 98.0],
            &[49.0, 2.0, 97.0],
            &x_centers,
            &y_centers,
        );
        assert_eq!(assigned, vec![1, 3, 5]);
    }

    #[test]
    fn select_points_keeps_requested_columns() {
        let (xc, yc) = square();
        let result = CpuBackend.nearest_channels(&[0.0, 1.0, 1.0], &yc, &[0.0, 0.0, 1.0], &xc, 1);
        let kept = result.select_points(&[2]);
        assert_eq!(kept.n_points(), 1);
        assert_eq!(kept.indices[[0, 0]], 3);
    }

    #[test]
    fn cpu_is_always_available() {
        assert_eq!(backend_for(ComputeDevice::Cpu).name(), "cpu");
        let parallel = backend_for(ComputeDevice::Parallel);
        assert!(parallel.name() == "cpu" || parallel.name() == "parallel");
    }

    #[test]
    fn brute_force_matches_backend() {
        let (xc, yc) = square();
        let (channel, _) = brute_force_nearest(0.8, 0.9, &yc, &xc).unwrap();
        let result = CpuBackend.nearest_channels(&[0.8], &yc, &[0.9], &xc, 1);
        assert_eq!(result.indices[[0, 0]], channel);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_backend_matches_cpu() {
        let xc = vec![11.0, 43.0, 27.0, 59.0, 11.0, 43.0];
        let yc = vec![0.0, 0.0, 20.0, 20.0, 40.0, 40.0];
        let xs = vec![20.0, 40.0, 35.0];
        let ys = vec![10.0, 30.0, 5.0];
        let cpu = CpuBackend.nearest_channels(&ys, &yc, &xs, &xc, 3);
        let par = ParallelBackend.nearest_channels(&ys, &yc, &xs, &xc, 3);
        assert_eq!(cpu.indices, par.indices);
        assert_eq!(cpu.sq_distances, par.sq_distances);
    }
}
