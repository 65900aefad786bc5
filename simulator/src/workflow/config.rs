use crate::generator::probe::ProbeGeneratorConfig;
use anyhow::Context;
use probecore::prelude::DEFAULT_CLICK_TOLERANCE;
use probecore::{ChannelId, DisplayParams, TemplateArgs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub probe: ProbeGeneratorConfig,
    pub template: TemplateArgs,
    pub display: DisplayParams,
    pub bad_channels: Vec<ChannelId>,
    pub click_tolerance: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            probe: ProbeGeneratorConfig::default(),
            template: TemplateArgs::default(),
            display: DisplayParams::default(),
            bad_channels: Vec::new(),
            click_tolerance: DEFAULT_CLICK_TOLERANCE,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        probe: ProbeGeneratorConfig,
        template: TemplateArgs,
        display: DisplayParams,
        bad_channels: Vec<ChannelId>,
    ) -> Self {
        Self {
            probe,
            template,
            display,
            bad_channels,
            ..Default::default()
        }
    }
}
