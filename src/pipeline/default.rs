use super::{DeviceExport, DeviceState, Stage, StageContext};
use crate::record::{Capability, CapabilityValue, Dim, Record};
use crate::timer::{TimerId, TimerKind};
use crate::{KakuError, Result};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct ToggleSlot {
    timer: Option<TimerId>,
    /// Value the pending timer will revert
    armed_for: Option<bool>,
    /// Value currently being written back by a fired timer
    reverting_to: Option<bool>,
}

/// Base of every device type: group re-keying, pairing export and toggle-after-timeout.
#[derive(Debug, Default)]
pub struct DefaultStage {
    toggles: HashMap<Capability, ToggleSlot>,
}

impl Stage for DefaultStage {
    fn name(&self) -> &'static str {
        "default"
    }

    fn inbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Option<Record> {
        // A group frame matched through the address is attributed to this device
        if record.is_group() {
            if let Some(id) = &ctx.device.data.id {
                if record.id.as_ref() != Some(id) {
                    record.id = Some(id.clone());
                    record.unit = ctx.device.data.unit.clone();
                }
            }
        }
        Some(record)
    }

    fn capability_written(
        &mut self,
        ctx: &mut StageContext<'_>,
        capability: Capability,
        value: CapabilityValue,
    ) {
        let value = match value.as_bool() {
            Some(v) => v,
            None => return,
        };
        let config = match &ctx.device.options.toggle_timeout {
            Some(c) if c.applies_to(capability) && ctx.device.has_capability(capability) => {
                c.clone()
            }
            _ => return,
        };
        let slot = self.toggles.entry(capability).or_default();

        if slot.reverting_to.take() == Some(value) {
            return;
        }
        if slot.timer.is_some() && slot.armed_for == Some(value) {
            debug!("{:?} already reverts from {}", capability, value);
            return;
        }
        if let Some(id) = slot.timer.take() {
            ctx.scheduler.cancel(id);
        }
        slot.armed_for = None;

        if let Some(after) = config.resolve(capability, value, ctx.device.settings.as_ref()) {
            debug!("Reverting {:?} to {} in {:?}", capability, !value, after);
            let timer = ctx.timer(TimerKind::ToggleRevert { capability, value });
            slot.timer = Some(ctx.scheduler.schedule(after, timer));
            slot.armed_for = Some(value);
        }
    }

    fn timer_fired(
        &mut self,
        _ctx: &mut StageContext<'_>,
        id: TimerId,
        kind: &TimerKind,
    ) -> Option<Record> {
        let (capability, value) = match kind {
            TimerKind::ToggleRevert { capability, value } => (*capability, *value),
            _ => return None,
        };
        let slot = self.toggles.get_mut(&capability)?;
        if slot.timer != Some(id) {
            return None;
        }
        slot.timer = None;
        slot.armed_for = None;
        slot.reverting_to = Some(!value);

        let mut record = Record {
            state: Some(!value as u8),
            ..Default::default()
        };
        record.set_capability(capability, CapabilityValue::Bool(!value));
        Some(record)
    }

    fn export(&self, device: &DeviceState, export: &mut DeviceExport) -> Result<()> {
        if device.data.is_group() {
            return Err(KakuError::CannotPairWithGroupButton);
        }
        let data = &mut export.data;
        data.group = Some(0);
        data.state = Some(data.state_on() as u8);
        if export.capabilities.contains(&Capability::Dim) {
            data.dim = match data.dim {
                Some(Dim::Level(l)) if l != 0.0 => Some(Dim::Level(l)),
                Some(Dim::Level(_)) | None => Some(Dim::Level(1.0)),
                gesture => gesture,
            };
        }
        Ok(())
    }

    fn deactivate(&mut self, ctx: &mut StageContext<'_>) {
        for (_, slot) in self.toggles.drain() {
            if let Some(id) = slot.timer {
                ctx.scheduler.cancel(id);
            }
        }
    }
}
