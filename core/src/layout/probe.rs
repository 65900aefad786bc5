use crate::prelude::{ChannelId, ExclusionSet, ProbeError, ProbeResult};

/// Physical channel layout of a probe, in electrode order.
///
/// `xc[i]`, `yc[i]` and `kcoords[i]` describe electrode `i`; `channel_map[i]`
/// is the external identifier of that electrode, which need not be
/// contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeLayout {
    xc: Vec<f64>,
    yc: Vec<f64>,
    kcoords: Vec<u32>,
    channel_map: Vec<ChannelId>,
    n_chan: usize,
}

impl ProbeLayout {
    pub fn new(
        xc: Vec<f64>,
        yc: Vec<f64>,
        kcoords: Vec<u32>,
        channel_map: Vec<ChannelId>,
    ) -> ProbeResult<Self> {
        let layout = Self {
            n_chan: xc.len(),
            xc,
            yc,
            kcoords,
            channel_map,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Single-shank layout with identifiers `0..n`.
    pub fn from_positions(xc: Vec<f64>, yc: Vec<f64>) -> ProbeResult<Self> {
        let n = xc.len();
        Self::new(xc, yc, vec![0; n], (0..n as ChannelId).collect())
    }

    pub fn empty() -> Self {
        Self {
            xc: Vec::new(),
            yc: Vec::new(),
            kcoords: Vec::new(),
            channel_map: Vec::new(),
            n_chan: 0,
        }
    }

    pub fn validate(&self) -> ProbeResult<()> {
        let lengths = [
            ("yc", self.yc.len()),
            ("kcoords", self.kcoords.len()),
            ("channel_map", self.channel_map.len()),
        ];
        for (name, len) in lengths {
            if len != self.n_chan {
                return Err(ProbeError::InvalidLayout(format!(
                    "{} has {} entries, expected {}",
                    name, len, self.n_chan
                )));
            }
        }
        if let Some(idx) = self
            .xc
            .iter()
            .zip(&self.yc)
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(ProbeError::InvalidLayout(format!(
                "electrode {} has a non-finite coordinate",
                idx
            )));
        }
        Ok(())
    }

    pub fn n_chan(&self) -> usize {
        self.n_chan
    }

    pub fn is_empty(&self) -> bool {
        self.n_chan == 0
    }

    pub fn xc(&self) -> &[f64] {
        &self.xc
    }

    pub fn yc(&self) -> &[f64] {
        &self.yc
    }

    pub fn kcoords(&self) -> &[u32] {
        &self.kcoords
    }

    pub fn channel_map(&self) -> &[ChannelId] {
        &self.channel_map
    }

    pub fn position(&self, electrode: usize) -> Option<(f64, f64)> {
        Some((*self.xc.get(electrode)?, *self.yc.get(electrode)?))
    }

    pub fn channel_id(&self, electrode: usize) -> Option<ChannelId> {
        self.channel_map.get(electrode).copied()
    }

    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xc.iter().copied().zip(self.yc.iter().copied())
    }

    /// The layout the sorter works with once `excluded` channels are removed.
    pub fn without_channels(&self, excluded: &ExclusionSet) -> Self {
        let keep: Vec<usize> = (0..self.n_chan)
            .filter(|&i| !excluded.contains(&self.channel_map[i]))
            .collect();
        Self {
            xc: keep.iter().map(|&i| self.xc[i]).collect(),
            yc: keep.iter().map(|&i| self.yc[i]).collect(),
            kcoords: keep.iter().map(|&i| self.kcoords[i]).collect(),
            channel_map: keep.iter().map(|&i| self.channel_map[i]).collect(),
            n_chan: keep.len(),
        }
    }
}

impl Default for ProbeLayout {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = ProbeLayout::new(vec![0.0, 1.0], vec![0.0], vec![0, 0], vec![0, 1]).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidLayout(_)));

        let err = ProbeLayout::new(vec![0.0], vec![0.0], vec![0], vec![]).unwrap_err();
        assert!(err.to_string().contains("channel_map"));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let err = ProbeLayout::from_positions(vec![0.0, f64::NAN], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidLayout(_)));
    }

    #[test]
    fn removing_channels_keeps_electrode_order() {
        let layout = ProbeLayout::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![10.0, 20.0, 30.0, 40.0],
            vec![0, 0, 1, 1],
            vec![7, 3, 9, 4],
        )
        .unwrap();
        let excluded: ExclusionSet = [3, 4].into_iter().collect();
        let revised = layout.without_channels(&excluded);
        assert_eq!(revised.n_chan(), 2);
        assert_eq!(revised.channel_map(), &[7, 9]);
        assert_eq!(revised.xc(), &[0.0, 2.0]);
        assert_eq!(revised.kcoords(), &[0, 1]);
        assert!(revised.validate().is_ok());
    }

    #[test]
    fn empty_layout_is_valid() {
        let layout = ProbeLayout::empty();
        assert!(layout.validate().is_ok());
        assert!(layout.is_empty());
        assert_eq!(layout.position(0), None);
    }
}
