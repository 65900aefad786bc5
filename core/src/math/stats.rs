pub struct StatsHelper;

impl StatsHelper {
    /// Sorted distinct values; non-finite entries are dropped.
    pub fn unique_sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        sorted
    }

    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Median gap between consecutive distinct values, e.g. a probe's row pitch.
    pub fn median_pitch(values: &[f64]) -> Option<f64> {
        let unique = Self::unique_sorted(values);
        let gaps: Vec<f64> = unique.windows(2).map(|w| w[1] - w[0]).collect();
        Self::median(&gaps)
    }

    /// Values `start, start + step, ...` strictly below `stop`.
    pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
        if step.is_nan() || step <= 0.0 || !start.is_finite() || !stop.is_finite() || stop <= start {
            return Vec::new();
        }
        let count = ((stop - start) / step).ceil() as usize;
        (0..count).map(|i| start + i as f64 * step).collect()
    }

    /// `count` evenly spaced values from `start` to `stop` inclusive.
    pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (count - 1) as f64;
                (0..count)
                    .map(|i| {
                        if i == count - 1 {
                            stop
                        } else {
                            start + i as f64 * step
                        }
                    })
                    .collect()
            }
        }
    }

    pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
        values.iter().copied().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
