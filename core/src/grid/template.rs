use crate::layout::ProbeLayout;
use crate::math::neighbors::{NearestChannels, NeighborBackend};
use crate::math::stats::StatsHelper;
use crate::prelude::{ProbeError, ProbeResult, TemplateArgs, XCenters, DEFAULT_DMINX};
use log::debug;

/// Parameter bundle shared by template-grid and center derivation.
///
/// Carries the resolved spacings and search radius, the revised channel
/// geometry they were computed from, the raw candidate axes `yup`/`xup`,
/// and the filtered template positions `xcup`/`ycup`.
#[derive(Debug, Clone)]
pub struct TemplateOps {
    pub xc: Vec<f64>,
    pub yc: Vec<f64>,
    /// Shank ids of the revised channels, carried with the geometry for
    /// downstream sorting stages.
    pub kcoords: Vec<u32>,
    pub dmin: f64,
    pub dminx: f64,
    pub max_channel_distance: f64,
    pub x_centers: Option<XCenters>,
    pub n_nearest: usize,
    pub yup: Vec<f64>,
    pub xup: Vec<f64>,
    pub xcup: Vec<f64>,
    pub ycup: Vec<f64>,
    pub neighbors: NearestChannels,
}

impl TemplateOps {
    pub fn grid_x(&self) -> &[f64] {
        &self.xcup
    }

    pub fn grid_y(&self) -> &[f64] {
        &self.ycup
    }

    /// Retained template positions.
    pub fn len(&self) -> usize {
        self.xcup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xcup.is_empty()
    }

    /// Candidate positions before distance filtering.
    pub fn raw_grid_size(&self) -> usize {
        self.xup.len() * self.yup.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xcup.iter().copied().zip(self.ycup.iter().copied())
    }
}

fn positive(name: &str, value: f64) -> ProbeResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProbeError::InvalidParameter(format!(
            "{} must be a positive finite value, got {}",
            name, value
        )))
    }
}

/// Resolves spacings and lays out the candidate template axes over the
/// extent of `layout`. No filtering happens here.
pub fn template_centers(layout: &ProbeLayout, args: &TemplateArgs) -> ProbeResult<TemplateOps> {
    if args.n_nearest == 0 {
        return Err(ProbeError::InvalidParameter(
            "n_nearest must be at least 1".into(),
        ));
    }

    let dminx = match args.dminx {
        Some(value) => positive("dminx", value)?,
        None => StatsHelper::median_pitch(layout.xc()).unwrap_or(DEFAULT_DMINX),
    };
    let dmin = match args.dmin {
        Some(value) => positive("dmin", value)?,
        None => StatsHelper::median_pitch(layout.yc()).unwrap_or(dminx),
    };
    let max_channel_distance = args.max_channel_distance.unwrap_or(dmin.max(dminx));
    if max_channel_distance.is_nan() {
        return Err(ProbeError::InvalidParameter(
            "max_channel_distance is NaN".into(),
        ));
    }

    let mut ops = TemplateOps {
        xc: layout.xc().to_vec(),
        yc: layout.yc().to_vec(),
        kcoords: layout.kcoords().to_vec(),
        dmin,
        dminx,
        max_channel_distance,
        x_centers: args.x_centers.clone(),
        n_nearest: args.n_nearest,
        yup: Vec::new(),
        xup: Vec::new(),
        xcup: Vec::new(),
        ycup: Vec::new(),
        neighbors: NearestChannels::empty(0),
    };

    let (Some((xmin, xmax)), Some((ymin, ymax))) =
        (StatsHelper::extent(layout.xc()), StatsHelper::extent(layout.yc()))
    else {
        return Ok(ops);
    };

    let y_step = (dmin / 2.0).floor();
    if y_step < 1.0 {
        return Err(ProbeError::InvalidParameter(format!(
            "dmin {} leaves no vertical template spacing",
            dmin
        )));
    }
    ops.yup = StatsHelper::arange(ymin, ymax + 1e-5, y_step);

    let nx = ((xmax - xmin) / (dminx / 2.0)).round() as usize + 1;
    ops.xup = StatsHelper::linspace(xmin, xmax, nx);

    Ok(ops)
}

/// Builds the template grid for `layout` and keeps the candidates whose
/// closest channel lies within `max_channel_distance`.
///
/// An empty layout, or a search radius of zero or less, yields an empty
/// grid rather than an error.
pub fn derive_template_grid(
    layout: &ProbeLayout,
    args: &TemplateArgs,
    backend: &dyn NeighborBackend,
) -> ProbeResult<TemplateOps> {
    let mut ops = template_centers(layout, args)?;
    if ops.xc.is_empty() || ops.max_channel_distance <= 0.0 {
        debug!(
            "template grid skipped: {} channels, max distance {}",
            ops.xc.len(),
            ops.max_channel_distance
        );
        return Ok(ops);
    }

    // xup outer, yup inner
    let mut xs = Vec::with_capacity(ops.raw_grid_size());
    let mut ys = Vec::with_capacity(ops.raw_grid_size());
    for &x in &ops.xup {
        for &y in &ops.yup {
            xs.push(x);
            ys.push(y);
        }
    }

    let neighbors = backend.nearest_channels(&ys, &ops.yc, &xs, &ops.xc, ops.n_nearest);
    let limit = ops.max_channel_distance.powi(2);
    let keep: Vec<usize> = (0..neighbors.n_points())
        .filter(|&p| neighbors.closest_sq_distance(p).is_some_and(|d| d <= limit))
        .collect();

    ops.xcup = keep.iter().map(|&p| xs[p]).collect();
    ops.ycup = keep.iter().map(|&p| ys[p]).collect();
    ops.neighbors = neighbors.select_points(&keep);

    debug!(
        "template grid kept {} of {} candidates via {} backend",
        ops.len(),
        xs.len(),
        backend.name()
    );
    Ok(ops)
}
