//! Protocol independent device data exchanged with the host.

use crate::frame::Symbol;
use std::collections::BTreeMap;

/// Dim level or relative dim gesture
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dim {
    /// Absolute level, nominally in `[0, 1]`
    Level(f64),
    /// Dim up gesture
    Up,
    /// Dim down gesture
    Down,
}

impl Dim {
    /// The absolute level, if any
    pub fn level(self) -> Option<f64> {
        match self {
            Dim::Level(l) => Some(l),
            _ => None,
        }
    }
}

/// Direction or rest state of a window covering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowCoveringsState {
    /// Moving up
    Up,
    /// Moving down
    Down,
    /// Not moving
    Idle,
}

impl WindowCoveringsState {
    /// Up for down and down for up
    pub fn inverted(self) -> Self {
        match self {
            WindowCoveringsState::Up => WindowCoveringsState::Down,
            WindowCoveringsState::Down => WindowCoveringsState::Up,
            WindowCoveringsState::Idle => WindowCoveringsState::Idle,
        }
    }
}

/// Host visible device capabilities, in no particular order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// `onoff`
    OnOff,
    /// `dim`
    Dim,
    /// `windowcoverings_state`
    WindowCoveringsState,
    /// `alarm_contact`
    AlarmContact,
    /// `alarm_motion`
    AlarmMotion,
    /// `alarm_generic`
    AlarmGeneric,
    /// `alarm_tamper`
    AlarmTamper,
}

impl Capability {
    /// Host side name
    pub fn id(self) -> &'static str {
        match self {
            Capability::OnOff => "onoff",
            Capability::Dim => "dim",
            Capability::WindowCoveringsState => "windowcoverings_state",
            Capability::AlarmContact => "alarm_contact",
            Capability::AlarmMotion => "alarm_motion",
            Capability::AlarmGeneric => "alarm_generic",
            Capability::AlarmTamper => "alarm_tamper",
        }
    }
}

/// Value held by a capability
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CapabilityValue {
    /// Boolean capabilities
    Bool(bool),
    /// Dim capability
    Dim(Dim),
    /// Window covering capability
    WindowCoverings(WindowCoveringsState),
}

impl CapabilityValue {
    /// The boolean value, if this is a boolean capability
    pub fn as_bool(self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Truthiness used when a capability drives the state bit
    pub fn is_truthy(self) -> bool {
        match self {
            CapabilityValue::Bool(b) => b,
            CapabilityValue::Dim(Dim::Level(l)) => l != 0.0,
            CapabilityValue::Dim(_) => true,
            CapabilityValue::WindowCoverings(_) => true,
        }
    }
}

/// Decoded or to be encoded device data. Absent fields are meaningful.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// Address bits, 4 or 26 wide depending on the family
    pub address: Option<String>,
    /// 2 bit channel
    pub channel: Option<String>,
    /// 2 bit unit
    pub unit: Option<String>,
    /// Group (broadcast) flag, 0 or 1
    pub group: Option<u8>,
    /// State bit
    pub state: Option<u8>,
    /// On/off capability
    pub onoff: Option<bool>,
    /// Dim level or gesture
    pub dim: Option<Dim>,
    /// Dimming remote: frame carried a dim nibble
    pub isdim: Option<bool>,
    /// Dimming remote: derived dim direction
    pub dimup: Option<bool>,
    /// Old protocol pass-through bits
    pub undef: Option<Vec<Symbol>>,
    /// Wall switch button
    pub button_index: Option<usize>,
    /// Blind direction
    pub windowcoverings_state: Option<WindowCoveringsState>,
    /// Boolean sensor capabilities other than onoff
    pub alarms: BTreeMap<Capability, bool>,
    /// Derived identity
    pub id: Option<String>,
}

impl Record {
    /// True when the group field is set and non zero
    pub fn is_group(&self) -> bool {
        self.group.map_or(false, |g| g != 0)
    }

    /// True when the state field is set and non zero
    pub fn state_on(&self) -> bool {
        self.state.map_or(false, |s| s != 0)
    }

    /// Value of `capability` carried by this record
    pub fn capability(&self, capability: Capability) -> Option<CapabilityValue> {
        match capability {
            Capability::OnOff => self.onoff.map(CapabilityValue::Bool),
            Capability::Dim => self.dim.map(CapabilityValue::Dim),
            Capability::WindowCoveringsState => self
                .windowcoverings_state
                .map(CapabilityValue::WindowCoverings),
            alarm => self.alarms.get(&alarm).copied().map(CapabilityValue::Bool),
        }
    }

    /// Stores `value` under `capability`. Mismatched value kinds are ignored.
    pub fn set_capability(&mut self, capability: Capability, value: CapabilityValue) {
        match (capability, value) {
            (Capability::OnOff, CapabilityValue::Bool(b)) => self.onoff = Some(b),
            (Capability::Dim, CapabilityValue::Dim(d)) => self.dim = Some(d),
            (Capability::WindowCoveringsState, CapabilityValue::WindowCoverings(w)) => {
                self.windowcoverings_state = Some(w)
            }
            (Capability::OnOff, _)
            | (Capability::Dim, _)
            | (Capability::WindowCoveringsState, _) => {}
            (alarm, CapabilityValue::Bool(b)) => {
                self.alarms.insert(alarm, b);
            }
            _ => {}
        }
    }

    /// Copies every field set in `other` over this record
    pub fn overlay(&mut self, other: &Record) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            address,
            channel,
            unit,
            group,
            state,
            onoff,
            dim,
            isdim,
            dimup,
            undef,
            button_index,
            windowcoverings_state,
            id
        );
        for (k, v) in &other.alarms {
            self.alarms.insert(*k, *v);
        }
    }
}
