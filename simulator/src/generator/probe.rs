use anyhow::{bail, Context};
use probecore::layout::ProbeLayout;
use probecore::ChannelId;
use serde::{Deserialize, Serialize};

/// Shape of a synthetic multi-shank probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeGeneratorConfig {
    pub shanks: usize,
    pub columns: usize,
    pub rows: usize,
    pub vertical_pitch: f64,
    pub horizontal_pitch: f64,
    pub shank_pitch: f64,
    pub x_offset: f64,
    /// Shift odd rows by half a horizontal pitch (checkerboard sites).
    pub stagger: bool,
    /// Identifiers skipped when numbering channels, e.g. reference sites.
    pub reference_channels: Vec<ChannelId>,
}

impl Default for ProbeGeneratorConfig {
    fn default() -> Self {
        Self {
            shanks: 1,
            columns: 2,
            rows: 48,
            vertical_pitch: 20.0,
            horizontal_pitch: 32.0,
            shank_pitch: 250.0,
            x_offset: 11.0,
            stagger: true,
            reference_channels: Vec::new(),
        }
    }
}

impl ProbeGeneratorConfig {
    /// Single-shank checkerboard with 384 sites and one reference channel.
    pub fn neuropixels1() -> Self {
        Self {
            rows: 192,
            reference_channels: vec![191],
            ..Default::default()
        }
    }

    fn check_pitch(name: &str, value: f64) -> anyhow::Result<()> {
        if !value.is_finite() || value <= 0.0 {
            bail!("{} must be positive, got {}", name, value);
        }
        Ok(())
    }

    fn site_count(&self) -> anyhow::Result<usize> {
        self.shanks
            .checked_mul(self.columns)
            .and_then(|n| n.checked_mul(self.rows))
            .context("overflow computing site count for probe generator")
    }
}

pub fn build_probe_layout(config: &ProbeGeneratorConfig) -> anyhow::Result<ProbeLayout> {
    ProbeGeneratorConfig::check_pitch("vertical_pitch", config.vertical_pitch)?;
    ProbeGeneratorConfig::check_pitch("horizontal_pitch", config.horizontal_pitch)?;
    if config.shanks > 1 {
        ProbeGeneratorConfig::check_pitch("shank_pitch", config.shank_pitch)?;
    }
    let sites = config.site_count()?;

    let mut xc = Vec::with_capacity(sites);
    let mut yc = Vec::with_capacity(sites);
    let mut kcoords = Vec::with_capacity(sites);
    for shank in 0..config.shanks {
        let shank_x = config.x_offset + shank as f64 * config.shank_pitch;
        for row in 0..config.rows {
            let shift = if config.stagger && row % 2 == 1 {
                config.horizontal_pitch / 2.0
            } else {
                0.0
            };
            for column in 0..config.columns {
                xc.push(shank_x + column as f64 * config.horizontal_pitch + shift);
                yc.push(row as f64 * config.vertical_pitch);
                kcoords.push(shank as u32);
            }
        }
    }

    let channel_map: Vec<ChannelId> = (0..)
        .filter(|id| !config.reference_channels.contains(id))
        .take(sites)
        .collect();

    ProbeLayout::new(xc, yc, kcoords, channel_map).context("building synthetic probe layout")
}
