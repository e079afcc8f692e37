//! Device settings, the per device value store and toggle timeout configuration.

use crate::record::Capability;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Setting holding the mounting orientation, `"180"` for upside down
pub const ROTATED: &str = "rotated";

/// A stored setting or value
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
}

impl SettingValue {
    /// Numeric interpretation, parsing text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            SettingValue::Text(t) => t.trim().parse().ok(),
        }
    }

    /// Text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(t) => Some(t),
            SettingValue::Number(_) => None,
        }
    }
}

/// Key-value store provided by the host
pub trait SettingsStore {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<SettingValue>;
    /// Stores `value` under `key`
    fn set(&mut self, key: &str, value: SettingValue);
}

impl SettingsStore for HashMap<String, SettingValue> {
    fn get(&self, key: &str) -> Option<SettingValue> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.insert(key.to_string(), value);
    }
}

/// True when the `rotated` setting says the device is mounted upside down
pub fn is_rotated(settings: &dyn SettingsStore) -> bool {
    settings
        .get(ROTATED)
        .map_or(false, |v| v.as_text() == Some("180"))
}

/// Where a toggle timeout comes from
#[derive(Clone, Debug, PartialEq)]
pub enum TimeoutSpec {
    /// Fixed milliseconds, 0 disables
    Millis(u64),
    /// Name of a setting. Values below 1000 are minutes, others milliseconds.
    Setting(String),
}

impl TimeoutSpec {
    fn resolve(&self, settings: &dyn SettingsStore) -> Option<Duration> {
        let ms = match self {
            TimeoutSpec::Millis(ms) => *ms as f64,
            TimeoutSpec::Setting(name) => {
                let value = settings.get(name)?.as_number()?;
                if value > 0.0 && value < 1000.0 {
                    value * 60.0 * 1000.0
                } else {
                    value
                }
            }
        };
        if ms.is_finite() && ms > 0.0 {
            Some(Duration::from_millis(ms as u64))
        } else {
            None
        }
    }
}

/// Toggle-after-timeout configuration of a device type
#[derive(Clone, Debug, PartialEq)]
pub enum ToggleTimeout {
    /// Same timeout for every capability and value
    Fixed(TimeoutSpec),
    /// Timeout depending on the written value
    PerValue {
        /// Used after writing `false`
        off: TimeoutSpec,
        /// Used after writing `true`
        on: TimeoutSpec,
    },
    /// Only the listed capabilities revert
    PerCapability(BTreeMap<Capability, ToggleTimeout>),
}

impl ToggleTimeout {
    /// True if writes to `capability` are subject to reversion
    pub fn applies_to(&self, capability: Capability) -> bool {
        match self {
            ToggleTimeout::PerCapability(map) => map.contains_key(&capability),
            _ => true,
        }
    }

    /// Timeout to schedule after writing `value` to `capability`
    pub fn resolve(
        &self,
        capability: Capability,
        value: bool,
        settings: &dyn SettingsStore,
    ) -> Option<Duration> {
        match self {
            ToggleTimeout::Fixed(spec) => spec.resolve(settings),
            ToggleTimeout::PerValue { off, on } => {
                let spec = if value { on } else { off };
                spec.resolve(settings)
            }
            ToggleTimeout::PerCapability(map) => {
                map.get(&capability)?.resolve(capability, value, settings)
            }
        }
    }
}
