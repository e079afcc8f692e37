//! Arguments of the "frame received" automation trigger.

use crate::record::Record;

/// State argument of the trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    /// State bit 0
    Off,
    /// State bit 1
    On,
    /// Dimming remote gesture up
    DimUp,
    /// Dimming remote gesture down
    DimDown,
}

/// Trigger arguments as configured by the user. Unset arguments match anything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowArgs {
    /// Combined four character `unit + channel`
    pub unitchannel: Option<String>,
    /// Unit, `"g"` selects the group button
    pub unit: Option<String>,
    /// Channel
    pub channel: Option<String>,
    /// Group flag
    pub group: Option<u8>,
    /// State
    pub state: Option<FlowState>,
    /// Wall switch button
    pub button_index: Option<usize>,
    /// Dimming remote direction
    pub dimup: Option<bool>,
    /// Dimming remote dim frame
    pub isdim: Option<bool>,
}

impl FlowArgs {
    /// True when every set argument equals the corresponding record field
    pub fn matches(&self, record: &Record) -> bool {
        fn eq<T: PartialEq>(arg: &Option<T>, field: &Option<T>) -> bool {
            arg.as_ref().map_or(true, |a| Some(a) == field.as_ref())
        }
        let state = self.state.map_or(true, |s| match s {
            FlowState::On => record.state_on(),
            FlowState::Off => record.state.is_some() && !record.state_on(),
            FlowState::DimUp | FlowState::DimDown => false,
        });
        self.unitchannel.is_none()
            && state
            && eq(&self.unit, &record.unit)
            && eq(&self.channel, &record.channel)
            && eq(&self.group, &record.group)
            && eq(&self.button_index, &record.button_index)
            && eq(&self.dimup, &record.dimup)
            && eq(&self.isdim, &record.isdim)
    }
}
