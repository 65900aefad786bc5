use probecore::{ChannelId, ProbeScene, ProbeView, SettingsSource, SortingStatus};
use serde::{Deserialize, Serialize};

/// JSON document served to the plotting front end.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VisualizationModel {
    pub scene: ProbeScene,
    pub bad_channels: Vec<ChannelId>,
    pub sorting_status: SortingStatus,
}

impl VisualizationModel {
    pub fn from_view<S: SettingsSource>(view: &ProbeView<S>) -> Self {
        Self {
            scene: view.scene().clone(),
            bad_channels: view.settings().bad_channels().into_iter().collect(),
            sorting_status: view.sorting_status(),
        }
    }
}

/// Click position reported by the front end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClickRequest {
    pub x: f64,
    pub y: f64,
}
