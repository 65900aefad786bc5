use crate::layout::ProbeLayout;
use crate::prelude::{ChannelId, ExclusionSet, ProbeResult, TemplateArgs};

/// The settings collaborator: source of probe layouts and template
/// parameters, and owner of the bad-channel set.
pub trait SettingsSource {
    /// Layout with the bad channels removed, as the sorter sees it.
    fn probe_layout(&self) -> ProbeResult<Option<ProbeLayout>>;

    /// Layout with every channel.
    fn probe_layout_original(&self) -> ProbeResult<Option<ProbeLayout>>;

    fn template_args(&self) -> TemplateArgs;

    fn bad_channels(&self) -> ExclusionSet;

    fn set_bad_channels(&mut self, channels: ExclusionSet);

    /// Flips `channel` in the bad-channel set. Returns `true` when the
    /// channel is excluded afterwards.
    fn toggle_bad_channel(&mut self, channel: ChannelId) -> bool {
        let mut channels = self.bad_channels();
        let excluded = if channels.remove(&channel) {
            false
        } else {
            channels.insert(channel);
            true
        };
        self.set_bad_channels(channels);
        excluded
    }
}

/// Settings held in memory; the revised layout is derived on demand.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    probe: Option<ProbeLayout>,
    template_args: TemplateArgs,
    bad_channels: ExclusionSet,
}

impl InMemorySettings {
    pub fn new(probe: ProbeLayout, template_args: TemplateArgs) -> Self {
        Self {
            probe: Some(probe),
            template_args,
            bad_channels: ExclusionSet::new(),
        }
    }

    pub fn with_bad_channels(mut self, channels: impl IntoIterator<Item = ChannelId>) -> Self {
        self.bad_channels = channels.into_iter().collect();
        self
    }

    pub fn set_probe(&mut self, probe: Option<ProbeLayout>) {
        self.probe = probe;
    }

    pub fn set_template_args(&mut self, args: TemplateArgs) {
        self.template_args = args;
    }
}

impl SettingsSource for InMemorySettings {
    fn probe_layout(&self) -> ProbeResult<Option<ProbeLayout>> {
        Ok(self
            .probe
            .as_ref()
            .map(|probe| probe.without_channels(&self.bad_channels)))
    }

    fn probe_layout_original(&self) -> ProbeResult<Option<ProbeLayout>> {
        Ok(self.probe.clone())
    }

    fn template_args(&self) -> TemplateArgs {
        self.template_args.clone()
    }

    fn bad_channels(&self) -> ExclusionSet {
        self.bad_channels.clone()
    }

    fn set_bad_channels(&mut self, channels: ExclusionSet) {
        self.bad_channels = channels;
    }
}
