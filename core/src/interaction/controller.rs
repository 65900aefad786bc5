use crate::grid::{derive_centers, derive_template_grid, TemplateOps};
use crate::interaction::settings::SettingsSource;
use crate::layout::LayoutState;
use crate::math::neighbors::{backend_for, NeighborBackend};
use crate::prelude::{
    ChannelId, DisplayParams, ProbeError, ProbeResult, SortingStatus, SpotScale,
    DEFAULT_CLICK_TOLERANCE,
};
use crate::render::{project_scene, ProbeScene};
use crate::telemetry::{LogManager, MetricsRecorder, ViewMetrics};
use serde::{Deserialize, Serialize};

/// Result of a click on the probe view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "channel", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// The channel was added to the bad-channel set.
    Excluded(ChannelId),
    /// The channel was removed from the bad-channel set.
    Included(ChannelId),
    /// No channel spot at the clicked position.
    Missed,
    /// No probe is loaded.
    NoLayout,
}

struct Derived {
    state: Option<LayoutState>,
    template: Option<TemplateOps>,
    centers: Option<Vec<(f64, f64)>>,
}

/// Probe view controller.
///
/// Pulls layouts from the settings collaborator, derives template and
/// center overlays when they are shown, and turns clicks on channel spots
/// into bad-channel toggles. Every change recomputes the scene before
/// returning.
pub struct ProbeView<S: SettingsSource> {
    settings: S,
    backend: Option<Box<dyn NeighborBackend>>,
    display: DisplayParams,
    click_tolerance: f64,
    state: Option<LayoutState>,
    template: Option<TemplateOps>,
    centers: Option<Vec<(f64, f64)>>,
    scene: ProbeScene,
    sorting_status: SortingStatus,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<S: SettingsSource> ProbeView<S> {
    pub fn new(settings: S) -> Self {
        Self {
            settings,
            backend: None,
            display: DisplayParams::default(),
            click_tolerance: DEFAULT_CLICK_TOLERANCE,
            state: None,
            template: None,
            centers: None,
            scene: ProbeScene::default(),
            sorting_status: SortingStatus::default(),
            logger: LogManager::new("probe-view"),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Uses `backend` instead of the one named by the template arguments.
    pub fn with_backend(mut self, backend: Box<dyn NeighborBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_click_tolerance(mut self, tolerance: f64) -> Self {
        self.click_tolerance = tolerance;
        self
    }

    pub fn with_display(mut self, display: DisplayParams) -> Self {
        self.display = display;
        self
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    pub fn display(&self) -> DisplayParams {
        self.display
    }

    pub fn scene(&self) -> &ProbeScene {
        &self.scene
    }

    pub fn layout_state(&self) -> Option<&LayoutState> {
        self.state.as_ref()
    }

    pub fn template_grid(&self) -> Option<&TemplateOps> {
        self.template.as_ref()
    }

    pub fn centers(&self) -> Option<&[(f64, f64)]> {
        self.centers.as_deref()
    }

    pub fn sorting_status(&self) -> SortingStatus {
        self.sorting_status
    }

    pub fn metrics(&self) -> ViewMetrics {
        self.metrics.snapshot()
    }

    fn derive(&self) -> ProbeResult<Derived> {
        let Some(original) = self.settings.probe_layout_original()? else {
            return Ok(Derived {
                state: None,
                template: None,
                centers: None,
            });
        };
        let revised = self.settings.probe_layout()?.ok_or_else(|| {
            ProbeError::Settings("original layout present without a revised layout".into())
        })?;
        let state = LayoutState::load(revised, original, self.click_tolerance)?;

        if !self.display.needs_grid() {
            return Ok(Derived {
                state: Some(state),
                template: None,
                centers: None,
            });
        }

        let args = self.settings.template_args();
        let backend: &dyn NeighborBackend = match &self.backend {
            Some(backend) => backend.as_ref(),
            None => backend_for(args.device),
        };
        // templates are placed over the revised layout, as during sorting
        let template = derive_template_grid(state.revised(), &args, backend)?;
        let centers = derive_centers(&template, backend)?;
        Ok(Derived {
            state: Some(state),
            template: Some(template),
            centers: Some(centers),
        })
    }

    /// Reloads the layouts and recomputes overlays and scene.
    ///
    /// On error the previous state and scene are kept.
    pub fn refresh(&mut self) -> ProbeResult<()> {
        let derived = match self.derive() {
            Ok(derived) => derived,
            Err(err) => {
                self.metrics.record_error();
                self.logger.warn(&format!("refresh failed: {}", err));
                return Err(err);
            }
        };
        self.state = derived.state;
        self.template = derived.template;
        self.centers = derived.centers;

        let excluded = self.settings.bad_channels();
        self.scene = project_scene(
            self.state.as_ref(),
            self.template.as_ref(),
            self.centers.as_deref(),
            &excluded,
            &self.display,
        );
        self.metrics.record_refresh();
        self.logger.detail(&format!(
            "scene: {} channels, {} templates, {} centers",
            self.scene.channel_spots.len(),
            self.scene.template_spots.len(),
            self.scene.center_spots.len()
        ));
        Ok(())
    }

    /// Toggles the bad-channel state of the channel spot at `(x, y)`.
    ///
    /// Positions that match no channel, such as template or center spots,
    /// leave everything untouched.
    pub fn toggle_channel_at(&mut self, x: f64, y: f64) -> ProbeResult<ToggleOutcome> {
        let Some(state) = self.state.as_ref() else {
            self.logger.warn("click ignored, no probe loaded");
            return Ok(ToggleOutcome::NoLayout);
        };
        let Some((electrode, channel)) = state.channel_at(x, y) else {
            self.metrics.record_miss();
            self.logger
                .warn(&format!("no channel at ({}, {}), click ignored", x, y));
            return Ok(ToggleOutcome::Missed);
        };

        let previous = self.settings.bad_channels();
        let excluded = self.settings.toggle_bad_channel(channel);
        if let Err(err) = self.refresh() {
            // the scene still shows `previous`, so the settings must too
            self.settings.set_bad_channels(previous);
            self.logger
                .warn(&format!("toggle of channel {} reverted", channel));
            return Err(err);
        }
        self.metrics.record_toggle();
        self.logger.record(&format!(
            "channel {} (electrode {}) {}",
            channel,
            electrode,
            if excluded { "excluded" } else { "restored" }
        ));
        Ok(if excluded {
            ToggleOutcome::Excluded(channel)
        } else {
            ToggleOutcome::Included(channel)
        })
    }

    pub fn set_display(&mut self, display: DisplayParams) -> ProbeResult<()> {
        self.display = display;
        self.refresh()
    }

    pub fn set_show_template_grid(&mut self, show: bool) -> ProbeResult<()> {
        self.set_display(DisplayParams {
            show_template_grid: show,
            ..self.display
        })
    }

    pub fn set_show_centers(&mut self, show: bool) -> ProbeResult<()> {
        self.set_display(DisplayParams {
            show_centers: show,
            ..self.display
        })
    }

    pub fn set_lock_aspect_ratio(&mut self, lock: bool) -> ProbeResult<()> {
        self.set_display(DisplayParams {
            lock_aspect_ratio: lock,
            ..self.display
        })
    }

    pub fn set_spot_scale(&mut self, scale: SpotScale) -> ProbeResult<()> {
        self.set_display(DisplayParams {
            spot_scale: scale,
            ..self.display
        })
    }

    pub fn change_sorting_status(&mut self, status: SortingStatus) {
        self.sorting_status = status;
        self.logger.detail(&format!("sorting status {:?}", status));
    }

    /// Clears the scene and forgets the current probe.
    pub fn reset(&mut self) {
        self.scene = ProbeScene::default();
        self.state = None;
        self.template = None;
        self.centers = None;
    }

    pub fn prepare_for_new_context(&mut self) {
        self.logger.record("preparing for new context");
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::settings::InMemorySettings;
    use crate::layout::ProbeLayout;
    use crate::math::neighbors::{CpuBackend, NearestChannels};
    use crate::prelude::{ExclusionSet, TemplateArgs};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn square_view() -> ProbeView<InMemorySettings> {
        let probe = ProbeLayout::new(
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0; 4],
            vec![0, 1, 2, 3],
        )
        .unwrap();
        let mut view = ProbeView::new(InMemorySettings::new(probe, TemplateArgs::default()));
        view.refresh().unwrap();
        view
    }

    fn column_view(display: DisplayParams, args: TemplateArgs) -> ProbeView<InMemorySettings> {
        let xc: Vec<f64> = (0..16).map(|i| if i % 2 == 0 { 0.0 } else { 32.0 }).collect();
        let yc: Vec<f64> = (0..16).map(|i| (i / 2) as f64 * 20.0).collect();
        let probe = ProbeLayout::from_positions(xc, yc).unwrap();
        let mut view = ProbeView::new(InMemorySettings::new(probe, args)).with_display(display);
        view.refresh().unwrap();
        view
    }

    fn overlays() -> DisplayParams {
        DisplayParams {
            show_template_grid: true,
            show_centers: true,
            ..Default::default()
        }
    }

    fn bad(view: &ProbeView<InMemorySettings>) -> Vec<ChannelId> {
        view.settings().bad_channels().into_iter().collect()
    }

    #[test]
    fn clicking_a_channel_twice_restores_exclusions() {
        let mut view = square_view();
        assert_eq!(view.toggle_channel_at(0.0, 1.0).unwrap(), ToggleOutcome::Excluded(1));
        assert_eq!(bad(&view), vec![1]);
        assert_eq!(view.toggle_channel_at(0.0, 1.0).unwrap(), ToggleOutcome::Included(1));
        assert!(bad(&view).is_empty());
        assert_eq!(view.metrics().toggles, 2);
    }

    #[test]
    fn toggling_recolors_the_channel_spot() {
        let mut view = square_view();
        view.toggle_channel_at(1.0, 0.0).unwrap();
        let fills: Vec<_> = view.scene().channel_spots.iter().map(|s| s.fill).collect();
        assert_eq!(fills[2], Some(crate::render::spots::EXCLUDED_FILL));
        assert_eq!(fills[0], Some(crate::render::spots::ACTIVE_FILL));
        assert_eq!(view.layout_state().unwrap().revised().n_chan(), 3);
        assert_eq!(view.layout_state().unwrap().original().n_chan(), 4);
    }

    #[test]
    fn failed_refresh_reverts_the_toggle() {
        // dropping the top channel shrinks the median row pitch below 2
        let probe =
            ProbeLayout::from_positions(vec![0.0; 4], vec![0.0, 1.0, 3.0, 5.0]).unwrap();
        let mut view = ProbeView::new(InMemorySettings::new(probe, TemplateArgs::default()))
            .with_display(overlays());
        view.refresh().unwrap();
        let scene = view.scene().clone();

        assert!(matches!(
            view.toggle_channel_at(0.0, 5.0),
            Err(ProbeError::InvalidParameter(_))
        ));
        assert!(bad(&view).is_empty());
        assert_eq!(view.scene(), &scene);
        assert_eq!(
            view.scene().channel_spots[3].fill,
            Some(crate::render::spots::ACTIVE_FILL)
        );
        assert_eq!(view.metrics().toggles, 0);
        assert_eq!(view.metrics().errors, 1);

        assert_eq!(view.toggle_channel_at(0.0, 0.0).unwrap(), ToggleOutcome::Excluded(0));
        assert_eq!(bad(&view), vec![0]);
    }

    #[test]
    fn clicking_empty_space_changes_nothing() {
        let mut view = column_view(overlays(), TemplateArgs::default());
        let scene = view.scene().clone();
        let grid = view.template_grid().unwrap().grid_x().to_vec();

        assert_eq!(view.toggle_channel_at(16.0, 10.0).unwrap(), ToggleOutcome::Missed);
        assert!(bad(&view).is_empty());
        assert_eq!(view.scene(), &scene);
        assert_eq!(view.template_grid().unwrap().grid_x(), grid.as_slice());
        assert_eq!(view.metrics().lookup_misses, 1);
    }

    #[test]
    fn clicks_resolve_within_tolerance() {
        let mut view = square_view().with_click_tolerance(0.2);
        view.refresh().unwrap();
        assert_eq!(view.toggle_channel_at(0.9, 1.1).unwrap(), ToggleOutcome::Excluded(3));
        assert_eq!(view.toggle_channel_at(0.6, 0.6).unwrap(), ToggleOutcome::Missed);
    }

    #[test]
    fn excluded_channels_leave_the_template_grid() {
        let args = TemplateArgs {
            max_channel_distance: Some(5.0),
            ..Default::default()
        };
        let mut view = column_view(overlays(), args);
        assert_eq!(view.template_grid().unwrap().len(), 16);

        view.toggle_channel_at(32.0, 140.0).unwrap();
        assert_eq!(view.template_grid().unwrap().len(), 15);
        assert_eq!(view.scene().channel_spots.len(), 16);
        assert_eq!(view.scene().template_spots.len(), 15);
    }

    #[test]
    fn zero_radius_leaves_overlays_empty() {
        let args = TemplateArgs {
            max_channel_distance: Some(0.0),
            ..Default::default()
        };
        let view = column_view(overlays(), args);
        assert!(view.template_grid().unwrap().is_empty());
        assert_eq!(view.centers(), Some(&[][..]));
        assert!(view.scene().template_spots.is_empty());
        assert!(view.scene().center_spots.is_empty());
        assert_eq!(view.scene().channel_spots.len(), 16);
    }

    #[test]
    fn overlays_are_derived_only_when_shown() {
        let mut view = column_view(DisplayParams::default(), TemplateArgs::default());
        assert!(view.template_grid().is_none());
        assert!(view.centers().is_none());

        view.set_show_centers(true).unwrap();
        assert!(view.template_grid().is_some());
        assert!(view.scene().template_spots.is_empty());
        assert!(!view.scene().center_spots.is_empty());

        view.set_show_template_grid(true).unwrap();
        assert!(!view.scene().template_spots.is_empty());

        view.set_lock_aspect_ratio(true).unwrap();
        assert!(view.scene().aspect_locked);

        view.set_spot_scale(SpotScale::from_steps(40)).unwrap();
        assert_eq!(view.scene().channel_spots[0].size, 100.0);
    }

    #[test]
    fn no_probe_loaded_is_a_no_op() {
        let mut view = ProbeView::new(InMemorySettings::default()).with_display(overlays());
        view.refresh().unwrap();
        assert!(view.scene().is_empty());
        assert_eq!(view.toggle_channel_at(0.0, 0.0).unwrap(), ToggleOutcome::NoLayout);
        assert!(view.settings().bad_channels().is_empty());
    }

    #[test]
    fn reset_forgets_the_probe() {
        let mut view = column_view(overlays(), TemplateArgs::default());
        view.change_sorting_status(SortingStatus {
            preprocess: true,
            ..Default::default()
        });
        view.prepare_for_new_context();
        assert!(view.layout_state().is_none());
        assert!(view.template_grid().is_none());
        assert!(view.scene().is_empty());
        assert_eq!(view.toggle_channel_at(0.0, 0.0).unwrap(), ToggleOutcome::NoLayout);
        assert!(view.sorting_status().preprocess);

        view.refresh().unwrap();
        assert_eq!(view.scene().channel_spots.len(), 16);
    }

    #[test]
    fn invalid_parameters_keep_previous_scene() {
        let mut view = column_view(overlays(), TemplateArgs::default());
        let scene = view.scene().clone();
        view.settings_mut().set_template_args(TemplateArgs {
            dmin: Some(1.0),
            ..Default::default()
        });
        assert!(matches!(view.refresh(), Err(ProbeError::InvalidParameter(_))));
        assert_eq!(view.scene(), &scene);
        assert_eq!(view.metrics().errors, 1);
    }

    struct Lopsided;

    impl SettingsSource for Lopsided {
        fn probe_layout(&self) -> ProbeResult<Option<ProbeLayout>> {
            Ok(None)
        }

        fn probe_layout_original(&self) -> ProbeResult<Option<ProbeLayout>> {
            Ok(Some(ProbeLayout::from_positions(vec![0.0], vec![0.0])?))
        }

        fn template_args(&self) -> TemplateArgs {
            TemplateArgs::default()
        }

        fn bad_channels(&self) -> ExclusionSet {
            ExclusionSet::new()
        }

        fn set_bad_channels(&mut self, _channels: ExclusionSet) {}
    }

    #[test]
    fn missing_revised_layout_is_a_settings_error() {
        let mut view = ProbeView::new(Lopsided);
        assert!(matches!(view.refresh(), Err(ProbeError::Settings(_))));
    }

    struct Counting(Arc<AtomicUsize>);

    impl NeighborBackend for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn nearest_channels(
            &self,
            ys: &[f64],
            yc: &[f64],
            xs: &[f64],
            xc: &[f64],
            n_nearest: usize,
        ) -> NearestChannels {
            self.0.fetch_add(1, Ordering::SeqCst);
            CpuBackend.nearest_channels(ys, yc, xs, xc, n_nearest)
        }

        fn nearest_centers(
            &self,
            grid_x: &[f64],
            grid_y: &[f64],
            x_centers: &[f64],
            y_centers: &[f64],
        ) -> Vec<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            CpuBackend.nearest_centers(grid_x, grid_y, x_centers, y_centers)
        }
    }

    #[test]
    fn injected_backend_drives_derivation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ProbeLayout::from_positions(vec![0.0, 32.0], vec![0.0, 20.0]).unwrap();
        let mut view = ProbeView::new(InMemorySettings::new(probe, TemplateArgs::default()))
            .with_backend(Box::new(Counting(calls.clone())))
            .with_display(overlays());
        view.refresh().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
