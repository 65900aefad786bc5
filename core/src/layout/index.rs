use crate::prelude::{ProbeError, ProbeResult};
use std::collections::HashMap;

/// Spatial hash from channel coordinates to electrode indices.
///
/// Coordinates are bucketed into square cells at least as wide as the
/// lookup tolerance, so a query only inspects its own cell and the eight
/// around it. A query resolves to the closest electrode within `tolerance`;
/// a tolerance of zero demands an exact coordinate match.
#[derive(Debug, Clone)]
pub struct CoordinateIndex {
    tolerance: f64,
    cell: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    points: Vec<(f64, f64)>,
}

impl CoordinateIndex {
    pub fn build(xc: &[f64], yc: &[f64], tolerance: f64) -> ProbeResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ProbeError::InvalidParameter(format!(
                "click tolerance must be a finite non-negative value, got {}",
                tolerance
            )));
        }
        if xc.len() != yc.len() {
            return Err(ProbeError::InvalidLayout(format!(
                "{} x coordinates but {} y coordinates",
                xc.len(),
                yc.len()
            )));
        }

        let mut index = Self {
            tolerance,
            cell: if tolerance > 0.0 { tolerance } else { 1.0 },
            cells: HashMap::with_capacity(xc.len()),
            points: Vec::with_capacity(xc.len()),
        };

        for (electrode, (&x, &y)) in xc.iter().zip(yc).enumerate() {
            let key = index.cell_of(x, y);
            let bucket = index.cells.entry(key).or_default();
            if let Some(&first) = bucket
                .iter()
                .find(|&&other| index.points[other] == (x, y))
            {
                return Err(ProbeError::DuplicateCoordinate {
                    x,
                    y,
                    first,
                    second: electrode,
                });
            }
            bucket.push(electrode);
            index.points.push((x, y));
        }

        Ok(index)
    }

    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        ((x / self.cell).floor() as i64, (y / self.cell).floor() as i64)
    }

    /// Electrode index of the channel spot at `(x, y)`, if any.
    pub fn lookup(&self, x: f64, y: f64) -> Option<usize> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (cx, cy) = self.cell_of(x, y);
        let limit = self.tolerance * self.tolerance;

        let mut best: Option<(f64, usize)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &electrode in bucket {
                    let (px, py) = self.points[electrode];
                    let distance = (px - x).powi(2) + (py - y).powi(2);
                    if distance > limit {
                        continue;
                    }
                    let closer = match best {
                        None => true,
                        Some((d, e)) => distance < d || (distance == d && electrode < e),
                    };
                    if closer {
                        best = Some((distance, electrode));
                    }
                }
            }
        }
        best.map(|(_, electrode)| electrode)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
