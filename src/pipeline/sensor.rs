use super::{Stage, StageContext};
use crate::record::{CapabilityValue, Record};

/// Drives every boolean capability from the state bit and back.
pub struct Sensor {
    inverted: bool,
}

impl Sensor {
    /// Capability true sends state 1
    pub fn new() -> Self {
        Sensor { inverted: false }
    }

    /// Capability true sends state 0
    pub fn inverted() -> Self {
        Sensor { inverted: true }
    }
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Sensor {
    fn name(&self) -> &'static str {
        "sensor"
    }

    fn inbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Option<Record> {
        let state = record.state_on();
        for capability in &ctx.device.options.capabilities {
            if record.capability(*capability).is_none() {
                record.set_capability(*capability, CapabilityValue::Bool(state));
            }
        }
        Some(record)
    }

    fn outbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Record {
        // Declaration order, the last present capability wins
        for capability in &ctx.device.options.capabilities {
            if let Some(value) = record.capability(*capability) {
                record.state = Some((value.is_truthy() != self.inverted) as u8);
            }
        }
        record
    }
}

/// Doorbell: only presses trigger automations.
pub struct Doorbell;

impl Stage for Doorbell {
    fn name(&self) -> &'static str {
        "doorbell"
    }

    fn triggers_flows(&self, record: &Record) -> bool {
        record.state_on()
    }
}
