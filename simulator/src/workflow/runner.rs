use crate::generator::probe::build_probe_layout;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use probecore::telemetry::ViewMetrics;
use probecore::{ChannelId, InMemorySettings, ProbeScene, ProbeView, SettingsSource, ToggleOutcome};

pub struct WorkflowResult {
    pub scene: ProbeScene,
    pub bad_channels: Vec<ChannelId>,
    pub outcomes: Vec<ToggleOutcome>,
    pub template_count: usize,
    pub center_count: usize,
    pub metrics: ViewMetrics,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// A refreshed probe view over the configured synthetic probe.
    pub fn build_view(&self) -> anyhow::Result<ProbeView<InMemorySettings>> {
        let probe = build_probe_layout(&self.config.probe)?;
        let settings = InMemorySettings::new(probe, self.config.template.clone())
            .with_bad_channels(self.config.bad_channels.iter().copied());
        let mut view = ProbeView::new(settings)
            .with_click_tolerance(self.config.click_tolerance)
            .with_display(self.config.display);
        view.refresh().context("loading probe view")?;
        Ok(view)
    }

    /// Replays `clicks` against a fresh view.
    pub fn execute(&self, clicks: &[(f64, f64)]) -> anyhow::Result<WorkflowResult> {
        let mut view = self.build_view()?;

        let mut outcomes = Vec::with_capacity(clicks.len());
        for &(x, y) in clicks {
            let outcome = view
                .toggle_channel_at(x, y)
                .with_context(|| format!("toggling channel at ({}, {})", x, y))?;
            outcomes.push(outcome);
        }

        Ok(WorkflowResult {
            scene: view.scene().clone(),
            bad_channels: view.settings().bad_channels().into_iter().collect(),
            outcomes,
            template_count: view.template_grid().map_or(0, |ops| ops.len()),
            center_count: view.centers().map_or(0, |centers| centers.len()),
            metrics: view.metrics(),
        })
    }
}
