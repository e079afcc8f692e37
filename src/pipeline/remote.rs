use super::{ClearFields, DeviceState, Stage, StageContext};
use crate::families::Family;
use crate::flow::{FlowArgs, FlowState};
use crate::frame::bit_string;
use crate::identity::IdentityScheme;
use crate::record::{Dim, Record};
use crate::settings::SettingValue;
use crate::timer::{TimerId, TimerKind};
use log::{debug, trace};
use std::convert::TryFrom;
use std::time::Duration;

/// Keys remotes by address and maps unit/channel trigger arguments.
pub struct Remote;

impl Stage for Remote {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn identity_scheme(&self) -> Option<IdentityScheme> {
        Some(IdentityScheme::Address)
    }

    fn map_flow_args(&self, _device: &DeviceState, args: &mut FlowArgs) {
        if let Some(uc) = args.unitchannel.take() {
            let channel: String = uc.chars().skip(2).take(2).collect();
            args.unit = Some(uc.chars().take(2).collect());
            args.channel = Some(channel).filter(|c| !c.is_empty());
        }
        if args.unit.as_deref() == Some("g") {
            args.unit = Some("00".to_string());
            args.group = Some(1);
            args.channel = None;
        } else {
            args.group = Some(0);
        }
    }
}

/// Maps the unit of a multi button switch to a zero based button index.
#[derive(Debug, Default)]
pub struct WallSwitch {
    base_unit: Option<u32>,
}

impl WallSwitch {
    fn calc_base(unit: &str, buttons: u32) -> Option<u32> {
        let unit = u32::from_str_radix(unit, 2).ok()?;
        Some(unit - unit % buttons)
    }

    fn buttons(device: &DeviceState) -> u32 {
        device.options.button_count.max(1) as u32
    }

    /// Cached base unit, recomputed on every call while pairing
    fn base_unit(&mut self, device: &DeviceState) -> Option<u32> {
        if self.base_unit.is_none() || device.pairing {
            self.base_unit = device
                .data
                .unit
                .as_deref()
                .and_then(|u| Self::calc_base(u, Self::buttons(device)));
        }
        self.base_unit
    }

    fn mirrored(device: &DeviceState, index: u32) -> u32 {
        let buttons = Self::buttons(device);
        if buttons > 1 && !device.pairing && device.rotated() {
            buttons - 1 - index
        } else {
            index
        }
    }
}

impl Stage for WallSwitch {
    fn name(&self) -> &'static str {
        "wall_switch"
    }

    fn inbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Option<Record> {
        if record.is_group() {
            return None;
        }
        let buttons = Self::buttons(ctx.device);
        let unit = u32::from_str_radix(record.unit.as_deref()?, 2).ok()?;
        let base = match self.base_unit(ctx.device) {
            Some(base) => base,
            None if ctx.device.pairing => unit - unit % buttons,
            None => return None,
        };
        if unit < base || unit - base >= buttons {
            trace!("Unit {} outside buttons of base {}", unit, base);
            return None;
        }
        record.button_index = Some(Self::mirrored(ctx.device, unit - base) as usize);
        Some(record)
    }

    fn outbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Record {
        if let Some(index) = record.button_index.take() {
            let buttons = Self::buttons(ctx.device);
            let unit = u32::try_from(index)
                .ok()
                .filter(|index| *index < buttons)
                .and_then(|index| {
                    let base = self.base_unit(ctx.device)?;
                    Some(bit_string(base + Self::mirrored(ctx.device, index), 2))
                });
            if unit.is_none() {
                // Without a unit the record is not sendable
                debug!("Button {} outside {} buttons", index, buttons);
            }
            record.unit = unit;
        }
        record
    }

    fn map_flow_args(&self, device: &DeviceState, args: &mut FlowArgs) {
        let unit = args
            .unit
            .as_deref()
            .and_then(|u| u32::from_str_radix(u, 2).ok());
        if let Some(unit) = unit {
            args.button_index = Some((unit % Self::buttons(device)) as usize);
            args.unit = None;
        }
    }
}

/// Debounce window after a group frame
const DEBOUNCE: Duration = Duration::from_millis(2000);

/// Remote whose receivers lack group support: group sends are repeated per unit, and
/// retransmitted group frames are debounced.
#[derive(Debug, Default)]
pub struct RemoteValueline {
    debounce: Option<TimerId>,
}

impl Stage for RemoteValueline {
    fn name(&self) -> &'static str {
        "remote_valueline"
    }

    fn on_data(&mut self, ctx: &mut StageContext<'_>, record: Record) -> Option<Record> {
        if self.debounce.is_some() {
            trace!("Debounced {:?}", record);
            return None;
        }
        if record.is_group() {
            let timer = ctx.timer(TimerKind::Debounce);
            self.debounce = Some(ctx.scheduler.schedule(DEBOUNCE, timer));
        }
        Some(record)
    }

    fn after_send(&mut self, record: &Record) -> Vec<Record> {
        if record.group != Some(1) {
            return Vec::new();
        }
        debug!("Emulating group send");
        ["00", "01"]
            .iter()
            .map(|unit| Record {
                group: Some(0),
                unit: Some(unit.to_string()),
                ..record.clone()
            })
            .collect()
    }

    fn timer_fired(
        &mut self,
        _ctx: &mut StageContext<'_>,
        id: TimerId,
        kind: &TimerKind,
    ) -> Option<Record> {
        if *kind == TimerKind::Debounce && self.debounce == Some(id) {
            self.debounce = None;
        }
        None
    }

    fn deactivate(&mut self, ctx: &mut StageContext<'_>) {
        if let Some(id) = self.debounce.take() {
            ctx.scheduler.cancel(id);
        }
    }
}

const STORED_DIM: &str = "dim";

/// Remote sending dim levels: derives the dim direction from the previous level.
pub struct DimmingRemote;

impl Stage for DimmingRemote {
    fn name(&self) -> &'static str {
        "dimming_remote"
    }

    fn family(&self) -> Option<Family> {
        Some(Family::P36DimRemote)
    }

    fn clear_fields(&self) -> Option<ClearFields> {
        Some(ClearFields::DIM | ClearFields::DIMUP | ClearFields::ISDIM)
    }

    fn inbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Option<Record> {
        let dim = match record.dim {
            Some(Dim::Level(dim)) => dim,
            _ => return Some(record),
        };
        let previous = ctx
            .device
            .store
            .get(STORED_DIM)
            .and_then(|v| v.as_number())
            .filter(|v| !v.is_nan());
        record.dimup = match previous {
            Some(prev) if prev < dim || dim == 1.0 => Some(true),
            Some(prev) if prev > dim || dim == 0.0 => Some(false),
            Some(_) => None,
            None => Some(dim >= 0.5),
        };
        Some(record)
    }

    fn on_data(&mut self, ctx: &mut StageContext<'_>, record: Record) -> Option<Record> {
        if let (Some(_), Some(Dim::Level(dim))) = (record.dimup, record.dim) {
            ctx.device.store.set(STORED_DIM, SettingValue::Number(dim));
        }
        Some(record)
    }

    fn map_flow_args(&self, _device: &DeviceState, args: &mut FlowArgs) {
        match args.state {
            Some(FlowState::DimUp) | Some(FlowState::DimDown) => {
                args.dimup = Some(args.state == Some(FlowState::DimUp));
                args.isdim = Some(true);
                args.state = None;
            }
            _ => args.isdim = Some(false),
        }
    }
}
