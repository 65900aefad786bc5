use crate::grid::TemplateOps;
use crate::layout::LayoutState;
use crate::prelude::{DisplayParams, ExclusionSet};
use serde::{Deserialize, Serialize};

pub const CHANNEL_BASE_SIZE: f64 = 10.0;
pub const TEMPLATE_BASE_SIZE: f64 = 5.0;
pub const CENTER_BASE_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Square,
    Circle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Gray level in `[0, 1]`.
    Gray(f32),
    Blue,
    Green,
    White,
    Yellow,
}

pub const OUTLINE: Color = Color::Gray(0.5);
pub const EXCLUDED_FILL: Color = Color::Blue;
pub const ACTIVE_FILL: Color = Color::Green;
pub const TEMPLATE_FILL: Color = Color::White;
pub const CENTER_OUTLINE: Color = Color::Yellow;

/// One point handed to the plotting front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpotDescriptor {
    pub pos: (f64, f64),
    pub size: f64,
    pub outline: Color,
    pub fill: Option<Color>,
    pub symbol: Symbol,
}

/// Everything the plotting front end needs to draw the probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeScene {
    pub channel_spots: Vec<SpotDescriptor>,
    pub template_spots: Vec<SpotDescriptor>,
    pub center_spots: Vec<SpotDescriptor>,
    pub aspect_locked: bool,
}

impl ProbeScene {
    /// Channels first, then template positions, then centers.
    pub fn all_spots(&self) -> impl Iterator<Item = &SpotDescriptor> {
        self.channel_spots
            .iter()
            .chain(&self.template_spots)
            .chain(&self.center_spots)
    }

    pub fn len(&self) -> usize {
        self.channel_spots.len() + self.template_spots.len() + self.center_spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Projects layout, derived grids and exclusions into point descriptors.
///
/// Overlay lists stay empty unless their toggle is on and the derived data
/// is present.
pub fn project_scene(
    state: Option<&LayoutState>,
    template: Option<&TemplateOps>,
    centers: Option<&[(f64, f64)]>,
    excluded: &ExclusionSet,
    display: &DisplayParams,
) -> ProbeScene {
    let scale = display.spot_scale;
    let mut scene = ProbeScene {
        aspect_locked: display.lock_aspect_ratio,
        ..Default::default()
    };

    if let Some(state) = state {
        let original = state.original();
        let size = scale.apply(CHANNEL_BASE_SIZE);
        scene.channel_spots = original
            .positions()
            .zip(original.channel_map())
            .map(|(pos, channel)| SpotDescriptor {
                pos,
                size,
                outline: OUTLINE,
                fill: Some(if excluded.contains(channel) {
                    EXCLUDED_FILL
                } else {
                    ACTIVE_FILL
                }),
                symbol: Symbol::Square,
            })
            .collect();
    }

    if display.show_template_grid {
        if let Some(template) = template {
            let size = scale.apply(TEMPLATE_BASE_SIZE);
            scene.template_spots = template
                .positions()
                .map(|pos| SpotDescriptor {
                    pos,
                    size,
                    outline: OUTLINE,
                    fill: Some(TEMPLATE_FILL),
                    symbol: Symbol::Circle,
                })
                .collect();
        }
    }

    if display.show_centers {
        if let Some(centers) = centers {
            let size = scale.apply(CENTER_BASE_SIZE);
            scene.center_spots = centers
                .iter()
                .map(|&pos| SpotDescriptor {
                    pos,
                    size,
                    outline: CENTER_OUTLINE,
                    fill: None,
                    symbol: Symbol::Circle,
                })
                .collect();
        }
    }

    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{derive_centers, derive_template_grid};
    use crate::layout::ProbeLayout;
    use crate::math::neighbors::CpuBackend;
    use crate::prelude::{SpotScale, TemplateArgs};

    fn state() -> LayoutState {
        let layout = ProbeLayout::new(
            vec![0.0, 0.0, 32.0, 32.0],
            vec![0.0, 20.0, 0.0, 20.0],
            vec![0; 4],
            vec![0, 1, 2, 3],
        )
        .unwrap();
        LayoutState::load(layout.clone(), layout, 0.5).unwrap()
    }

    fn all_on(steps: u8) -> DisplayParams {
        DisplayParams {
            show_template_grid: true,
            show_centers: true,
            lock_aspect_ratio: true,
            spot_scale: SpotScale::from_steps(steps),
        }
    }

    fn sizes(scene: &ProbeScene) -> (f64, f64, f64) {
        (
            scene.channel_spots[0].size,
            scene.template_spots[0].size,
            scene.center_spots[0].size,
        )
    }

    #[test]
    fn spot_sizes_scale_linearly() {
        let state = state();
        let ops = derive_template_grid(state.revised(), &TemplateArgs::default(), &CpuBackend)
            .unwrap();
        let centers = derive_centers(&ops, &CpuBackend).unwrap();
        let excluded = ExclusionSet::new();

        let scene = project_scene(Some(&state), Some(&ops), Some(&centers), &excluded, &all_on(4));
        assert_eq!(sizes(&scene), (10.0, 5.0, 20.0));
        assert!(scene.aspect_locked);

        let scene = project_scene(Some(&state), Some(&ops), Some(&centers), &excluded, &all_on(40));
        assert_eq!(sizes(&scene), (100.0, 50.0, 200.0));
        assert_eq!(scene.len(), 4 + ops.len() + centers.len());
    }

    #[test]
    fn excluded_channels_are_filled_blue() {
        let state = state();
        let excluded: ExclusionSet = [2].into_iter().collect();
        let scene = project_scene(Some(&state), None, None, &excluded, &DisplayParams::default());
        let fills: Vec<_> = scene.channel_spots.iter().map(|s| s.fill).collect();
        assert_eq!(
            fills,
            vec![Some(ACTIVE_FILL), Some(ACTIVE_FILL), Some(EXCLUDED_FILL), Some(ACTIVE_FILL)]
        );
        assert!(scene.channel_spots.iter().all(|s| s.symbol == Symbol::Square));
        assert!(!scene.aspect_locked);
    }

    #[test]
    fn overlays_follow_toggles() {
        let state = state();
        let ops = derive_template_grid(state.revised(), &TemplateArgs::default(), &CpuBackend)
            .unwrap();
        let centers = derive_centers(&ops, &CpuBackend).unwrap();
        let display = DisplayParams {
            show_centers: true,
            ..Default::default()
        };
        let scene = project_scene(
            Some(&state),
            Some(&ops),
            Some(&centers),
            &ExclusionSet::new(),
            &display,
        );
        assert!(scene.template_spots.is_empty());
        assert_eq!(scene.center_spots.len(), centers.len());
        assert!(scene.center_spots.iter().all(|s| s.fill.is_none()));
        let order: Vec<_> = scene.all_spots().map(|s| s.symbol).collect();
        assert_eq!(order[0], Symbol::Square);
        assert_eq!(*order.last().unwrap(), Symbol::Circle);
    }

    #[test]
    fn no_layout_projects_empty_scene() {
        let scene = project_scene(None, None, None, &ExclusionSet::new(), &all_on(4));
        assert!(scene.is_empty());
        let json = scene.to_json().unwrap();
        assert!(json.contains("\"aspect_locked\":true"));
    }
}
