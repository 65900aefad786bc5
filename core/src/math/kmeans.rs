use crate::math::stats::StatsHelper;

/// Deterministic Lloyd's k-means over scalar observations.
pub struct KMeans1d {
    max_iterations: usize,
    tolerance: f64,
}

impl KMeans1d {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            tolerance,
        }
    }

    /// Refines `seeds` against `data`. Centers that end up without any
    /// observation are dropped, so fewer centers than seeds may come back.
    /// The result is sorted ascending with no repeats.
    pub fn fit(&self, data: &[f64], seeds: &[f64]) -> Vec<f64> {
        let mut centers = StatsHelper::unique_sorted(seeds);
        if data.is_empty() || centers.is_empty() {
            return Vec::new();
        }

        let mut counts = vec![0usize; centers.len()];
        for _ in 0..self.max_iterations {
            let mut sums = vec![0.0; centers.len()];
            counts.iter_mut().for_each(|c| *c = 0);
            for &value in data {
                let idx = nearest(&centers, value);
                sums[idx] += value;
                counts[idx] += 1;
            }

            let mut shift: f64 = 0.0;
            for (idx, center) in centers.iter_mut().enumerate() {
                if counts[idx] > 0 {
                    let updated = sums[idx] / counts[idx] as f64;
                    shift = shift.max((updated - *center).abs());
                    *center = updated;
                }
            }
            if shift <= self.tolerance {
                break;
            }
        }

        // final membership decides which centers survive
        counts.iter_mut().for_each(|c| *c = 0);
        for &value in data {
            counts[nearest(&centers, value)] += 1;
        }
        let kept: Vec<f64> = centers
            .into_iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(center, _)| center)
            .collect();
        StatsHelper::unique_sorted(&kept)
    }
}

impl Default for KMeans1d {
    fn default() -> Self {
        Self::new(100, 1e-6)
    }
}

fn nearest(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, &center) in centers.iter().enumerate() {
        let distance = (value - center).abs();
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}

/// `k` seeds spread evenly over the distinct values.
pub fn quantile_seeds(values: &[f64], k: usize) -> Vec<f64> {
    let unique = StatsHelper::unique_sorted(values);
    if unique.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(unique.len());
    if k == 1 {
        return vec![unique[unique.len() / 2]];
    }
    let last = (unique.len() - 1) as f64;
    (0..k)
        .map(|i| {
            let pos = (i as f64 * last / (k - 1) as f64).round() as usize;
            unique[pos]
        })
        .collect()
}

/// One seed per occupied stretch of a fixed-width histogram, placed at the
/// center of that stretch's fullest bin.
pub fn histogram_peak_seeds(values: &[f64], bin_width: f64) -> Vec<f64> {
    let Some((lo, hi)) = StatsHelper::extent(values) else {
        return Vec::new();
    };
    if hi <= lo || bin_width <= 0.0 {
        return vec![lo];
    }

    let n_bins = ((hi - lo) / bin_width).ceil().max(1.0) as usize;
    let width = (hi - lo) / n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    for &value in values {
        let bin = (((value - lo) / width).floor() as usize).min(n_bins - 1);
        counts[bin] += 1;
    }

    let mut seeds = Vec::new();
    let mut run_peak: Option<usize> = None;
    for (bin, &count) in counts.iter().enumerate() {
        if count == 0 {
            if let Some(peak) = run_peak.take() {
                seeds.push(lo + (peak as f64 + 0.5) * width);
            }
            continue;
        }
        match run_peak {
            Some(peak) if counts[peak] >= count => {}
            _ => run_peak = Some(bin),
        }
    }
    if let Some(peak) = run_peak {
        seeds.push(lo + (peak as f64 + 0.5) * width);
    }
    seeds
}
