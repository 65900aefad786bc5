use crate::grid::template::TemplateOps;
use crate::math::kmeans::{histogram_peak_seeds, quantile_seeds, KMeans1d};
use crate::math::neighbors::NeighborBackend;
use crate::math::stats::StatsHelper;
use crate::prelude::{ProbeError, ProbeResult, XCenters};
use log::debug;

/// Histogram bin width used to seed horizontal centers automatically.
pub const X_CENTER_BIN_WIDTH: f64 = 50.0;

/// Vertical grouping centers, spaced `2 * dmin` apart over the channel extent.
pub fn y_centers(ops: &TemplateOps) -> Vec<f64> {
    match StatsHelper::extent(&ops.yc) {
        Some((ymin, ymax)) => {
            StatsHelper::arange(ymin + ops.dmin - 1.0, ymax + ops.dmin + 1.0, 2.0 * ops.dmin)
        }
        None => Vec::new(),
    }
}

/// Checks the horizontal center parameter independently of the channel set.
fn validate_x_centers(param: Option<&XCenters>) -> ProbeResult<()> {
    match param {
        Some(XCenters::Count(0)) => Err(ProbeError::InvalidParameter(
            "x_centers count must be at least 1".into(),
        )),
        Some(XCenters::Positions(positions))
            if positions.is_empty() || positions.iter().any(|p| !p.is_finite()) =>
        {
            Err(ProbeError::InvalidParameter(
                "x_centers positions must be a non-empty list of finite values".into(),
            ))
        }
        _ => Ok(()),
    }
}

/// Horizontal grouping centers, fitted to the channel x positions by k-means.
pub fn x_centers(ops: &TemplateOps) -> ProbeResult<Vec<f64>> {
    validate_x_centers(ops.x_centers.as_ref())?;
    if ops.xc.is_empty() {
        return Ok(Vec::new());
    }
    let seeds = match &ops.x_centers {
        Some(XCenters::Count(k)) => quantile_seeds(&ops.xc, *k),
        Some(XCenters::Positions(positions)) => positions.clone(),
        None => histogram_peak_seeds(&ops.xc, X_CENTER_BIN_WIDTH),
    };
    Ok(KMeans1d::default().fit(&ops.xc, &seeds))
}

/// Grouping centers that attract at least one template position.
///
/// Every template position is assigned to its closest center of the
/// `x_centers × y_centers` grid. Centers are numbered
/// `row + column * y_centers.len()` and returned in that order.
pub fn derive_centers(
    ops: &TemplateOps,
    backend: &dyn NeighborBackend,
) -> ProbeResult<Vec<(f64, f64)>> {
    validate_x_centers(ops.x_centers.as_ref())?;
    if ops.is_empty() {
        return Ok(Vec::new());
    }
    let ycent = y_centers(ops);
    let xcent = x_centers(ops)?;
    let rows = ycent.len();

    let assigned = backend.nearest_centers(ops.grid_x(), ops.grid_y(), &xcent, &ycent);
    let mut used = vec![false; rows * xcent.len()];
    for center in assigned {
        if let Some(slot) = used.get_mut(center) {
            *slot = true;
        }
    }

    let centers: Vec<(f64, f64)> = used
        .iter()
        .enumerate()
        .filter(|(_, &hit)| hit)
        .map(|(center, _)| (xcent[center / rows], ycent[center % rows]))
        .collect();
    debug!(
        "{} of {} grouping centers in use",
        centers.len(),
        used.len()
    );
    Ok(centers)
}
