//! Per device type stage composition.
//!
//! A device type is an ordered list of [`Stage`]s, declared base first. The phases run as
//! follows:
//!
//! | phase                        | order          |
//! |------------------------------|----------------|
//! | `inbound` (parse)            | base to leaf   |
//! | `on_data` (record handling)  | leaf to base   |
//! | `outbound`                   | leaf to base   |
//! | `map_flow_args`              | leaf to base   |
//! | `export`                     | base to leaf   |
//!
//! `family`, `identity_scheme` and `clear_fields` are taken from the last stage that
//! provides one. Returning `None` from `inbound` or `on_data` drops the frame.

mod blinds;
mod default;
mod kaku;
mod remote;
mod sensor;

pub use blinds::Blinds;
pub use default::DefaultStage;
pub use kaku::{Dimmer, Kaku};
pub use remote::{DimmingRemote, Remote, RemoteValueline, WallSwitch};
pub use sensor::{Doorbell, Sensor};

use crate::families::Family;
use crate::flow::FlowArgs;
use crate::identity::IdentityScheme;
use crate::record::{Capability, CapabilityValue, Record};
use crate::settings::{is_rotated, SettingsStore, ToggleTimeout};
use crate::timer::{Scheduler, Timer, TimerId, TimerKind};
use crate::Result;
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Fields removed from the stored device data before it is used as a send object
    pub struct ClearFields:u8 {
        /// `onoff`
        const ONOFF = 1<<0;
        /// `dim`
        const DIM = 1<<1;
        /// `dimup`
        const DIMUP = 1<<2;
        /// `isdim`
        const ISDIM = 1<<3;
    }
}

impl ClearFields {
    /// Removes the selected fields from `record`
    pub fn apply(self, record: &mut Record) {
        if self.contains(ClearFields::ONOFF) {
            record.onoff = None;
        }
        if self.contains(ClearFields::DIM) {
            record.dim = None;
        }
        if self.contains(ClearFields::DIMUP) {
            record.dimup = None;
        }
        if self.contains(ClearFields::ISDIM) {
            record.isdim = None;
        }
    }
}

/// Device types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Codewheel switch, old protocol
    OldSwitch,
    /// Self-learning switch
    Switch,
    /// Self-learning dimmer
    Dimmer,
    /// Multi channel remote
    Remote,
    /// Wall mounted switch with one or more buttons
    WallSwitch,
    /// Remote without real group support
    RemoteValueline,
    /// Remote sending dim levels and gestures
    DimmingRemote,
    /// Contact or motion sensor
    Sensor,
    /// Doorbell push button
    Doorbell,
    /// Window covering actuator
    Blinds,
}

impl DeviceKind {
    /// Stage list, base first
    pub fn stages(self) -> Vec<Box<dyn Stage>> {
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(DefaultStage::default())];
        match self {
            DeviceKind::OldSwitch => {
                stages.push(Box::new(Kaku::new(Family::Old12, ClearFields::ONOFF)));
                return stages;
            }
            _ => stages.push(Box::new(Kaku::new(
                Family::P32,
                ClearFields::ONOFF | ClearFields::DIM,
            ))),
        }
        match self {
            DeviceKind::OldSwitch | DeviceKind::Switch => {}
            DeviceKind::Dimmer => stages.push(Box::new(Dimmer)),
            DeviceKind::Remote => stages.push(Box::new(Remote)),
            DeviceKind::WallSwitch => {
                stages.push(Box::new(Remote));
                stages.push(Box::new(WallSwitch::default()));
            }
            DeviceKind::RemoteValueline => {
                stages.push(Box::new(Remote));
                stages.push(Box::new(RemoteValueline::default()));
            }
            DeviceKind::DimmingRemote => {
                stages.push(Box::new(Remote));
                stages.push(Box::new(DimmingRemote));
            }
            DeviceKind::Sensor => stages.push(Box::new(Sensor::new())),
            DeviceKind::Doorbell => {
                stages.push(Box::new(Sensor::inverted()));
                stages.push(Box::new(Doorbell));
            }
            DeviceKind::Blinds => stages.push(Box::new(Blinds::default())),
        }
        stages
    }
}

/// Static configuration of a device
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceOptions {
    /// Capabilities in declaration order
    pub capabilities: Vec<Capability>,
    /// Toggle-after-timeout configuration
    pub toggle_timeout: Option<ToggleTimeout>,
    /// Buttons on a wall switch
    pub button_count: usize,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        DeviceOptions {
            capabilities: Vec::new(),
            toggle_timeout: None,
            button_count: 1,
        }
    }
}

/// Everything a stage may look at or change besides its own fields
pub struct DeviceState {
    /// Pairing data
    pub data: Record,
    /// Static configuration
    pub options: DeviceOptions,
    /// Last capability values
    pub values: HashMap<Capability, CapabilityValue>,
    /// User settings
    pub settings: Box<dyn SettingsStore>,
    /// Device value store
    pub store: Box<dyn SettingsStore>,
    /// True for the temporary device of the pairing wizard
    pub pairing: bool,
    /// Process unique token, timers are routed back by it
    pub token: u64,
}

impl DeviceState {
    /// Device id, empty before pairing completed
    pub fn id(&self) -> &str {
        self.data.id.as_deref().unwrap_or("")
    }

    /// True if the device declares `capability`
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.options.capabilities.contains(&capability)
    }

    /// True when mounted upside down
    pub fn rotated(&self) -> bool {
        is_rotated(self.settings.as_ref())
    }
}

/// Mutable view handed to stages
pub struct StageContext<'a> {
    /// Device state
    pub device: &'a mut DeviceState,
    /// Timer source
    pub scheduler: &'a mut dyn Scheduler,
}

impl StageContext<'_> {
    /// Timer owned by this device
    pub fn timer(&self, kind: TimerKind) -> Timer {
        Timer {
            owner: self.device.token,
            kind,
        }
    }
}

/// Device object handed to the pairing wizard
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceExport {
    /// Pairing data
    pub data: Record,
    /// Capabilities of the new device
    pub capabilities: Vec<Capability>,
}

/// One layer of a device type
pub trait Stage {
    /// Stage name for logging
    fn name(&self) -> &'static str;

    /// Frame family used by the device
    fn family(&self) -> Option<Family> {
        None
    }

    /// Identity scheme override
    fn identity_scheme(&self) -> Option<IdentityScheme> {
        None
    }

    /// Fields cleared from the stored data before sending
    fn clear_fields(&self) -> Option<ClearFields> {
        None
    }

    /// Adjusts a decoded record, `None` vetoes the frame
    fn inbound(&mut self, _ctx: &mut StageContext<'_>, record: Record) -> Option<Record> {
        Some(record)
    }

    /// Handles an accepted record, `None` drops it
    fn on_data(&mut self, _ctx: &mut StageContext<'_>, record: Record) -> Option<Record> {
        Some(record)
    }

    /// Adjusts a record before encoding
    fn outbound(&mut self, _ctx: &mut StageContext<'_>, record: Record) -> Record {
        record
    }

    /// Additional records to send after `record` was sent
    fn after_send(&mut self, _record: &Record) -> Vec<Record> {
        Vec::new()
    }

    /// False suppresses automation triggers for `record`
    fn triggers_flows(&self, _record: &Record) -> bool {
        true
    }

    /// A capability value was set, by the host or by a received frame
    fn capability_written(
        &mut self,
        _ctx: &mut StageContext<'_>,
        _capability: Capability,
        _value: CapabilityValue,
    ) {
    }

    /// A timer owned by the device fired, may synthesize a record
    fn timer_fired(
        &mut self,
        _ctx: &mut StageContext<'_>,
        _id: TimerId,
        _kind: &TimerKind,
    ) -> Option<Record> {
        None
    }

    /// Adjusts the pairing export
    fn export(&self, _device: &DeviceState, _export: &mut DeviceExport) -> Result<()> {
        Ok(())
    }

    /// Rewrites trigger arguments into record terms
    fn map_flow_args(&self, _device: &DeviceState, _args: &mut FlowArgs) {}

    /// Last accepted record
    fn last_frame(&self) -> Option<&Record> {
        None
    }

    /// Cancels all outstanding timers
    fn deactivate(&mut self, _ctx: &mut StageContext<'_>) {}
}
