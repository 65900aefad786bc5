use crate::layout::{CoordinateIndex, ProbeLayout};
use crate::prelude::{ChannelId, ProbeResult};

/// The two layouts of the current probe plus the click index.
///
/// `revised` has the excluded channels removed and drives template placement
/// the way the sorter sees the probe. `original` keeps every channel and
/// drives display and click resolution.
#[derive(Debug, Clone)]
pub struct LayoutState {
    revised: ProbeLayout,
    original: ProbeLayout,
    index: CoordinateIndex,
}

impl LayoutState {
    pub fn load(
        revised: ProbeLayout,
        original: ProbeLayout,
        click_tolerance: f64,
    ) -> ProbeResult<Self> {
        revised.validate()?;
        original.validate()?;
        let index = CoordinateIndex::build(original.xc(), original.yc(), click_tolerance)?;
        Ok(Self {
            revised,
            original,
            index,
        })
    }

    pub fn revised(&self) -> &ProbeLayout {
        &self.revised
    }

    pub fn original(&self) -> &ProbeLayout {
        &self.original
    }

    pub fn index(&self) -> &CoordinateIndex {
        &self.index
    }

    /// Electrode index and channel identifier of the spot at `(x, y)`.
    pub fn channel_at(&self, x: f64, y: f64) -> Option<(usize, ChannelId)> {
        let electrode = self.index.lookup(x, y)?;
        let channel = self.original.channel_id(electrode)?;
        Some((electrode, channel))
    }
}
