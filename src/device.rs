//! A paired (or pairing) device instance running its stage pipeline.

use crate::codec::codec;
use crate::families::Family;
use crate::flow::FlowArgs;
use crate::frame::Frame;
use crate::identity::{self, IdentityRegistry, IdentityScheme};
use crate::pipeline::{
    ClearFields, DeviceExport, DeviceKind, DeviceOptions, DeviceState, Stage, StageContext,
};
use crate::record::{Capability, CapabilityValue, Record};
use crate::settings::{SettingValue, SettingsStore};
use crate::timer::{Scheduler, Timer, TimerId};
use crate::{KakuError, Result};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of device tokens. Ids are not unique, remotes sharing an address share it.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A record accepted by a device
#[derive(Clone, Debug, PartialEq)]
pub struct Received {
    /// Record after all stages ran
    pub record: Record,
    /// False when automations must not be triggered
    pub trigger_flows: bool,
}

/// One device instance
pub struct Device {
    kind: DeviceKind,
    family: Family,
    scheme: IdentityScheme,
    clear: ClearFields,
    stages: Vec<Box<dyn Stage>>,
    state: DeviceState,
    active: bool,
}

fn new_store() -> Box<dyn SettingsStore> {
    Box::new(HashMap::<String, SettingValue>::new())
}

fn apply_values(stages: &mut [Box<dyn Stage>], ctx: &mut StageContext<'_>, record: &Record) {
    let capabilities = ctx.device.options.capabilities.clone();
    for capability in capabilities {
        if let Some(value) = record.capability(capability) {
            set_value(stages, ctx, capability, value);
        }
    }
}

fn finish(
    stages: &mut [Box<dyn Stage>],
    ctx: &mut StageContext<'_>,
    mut record: Record,
) -> Option<Received> {
    for stage in stages.iter_mut().rev() {
        record = stage.on_data(ctx, record)?;
    }
    apply_values(stages, ctx, &record);
    let trigger_flows = stages.iter().all(|s| s.triggers_flows(&record));
    Some(Received {
        record,
        trigger_flows,
    })
}

fn set_value(
    stages: &mut [Box<dyn Stage>],
    ctx: &mut StageContext<'_>,
    capability: Capability,
    value: CapabilityValue,
) {
    ctx.device.values.insert(capability, value);
    for stage in stages.iter_mut() {
        stage.capability_written(ctx, capability, value);
    }
}

impl Device {
    /// Creates an inactive device from its pairing data
    pub fn new(
        kind: DeviceKind,
        data: Record,
        options: DeviceOptions,
        settings: Box<dyn SettingsStore>,
        store: Box<dyn SettingsStore>,
    ) -> Self {
        let stages = kind.stages();
        let family = stages
            .iter()
            .rev()
            .find_map(|s| s.family())
            .unwrap_or(Family::P32);
        let scheme = stages
            .iter()
            .rev()
            .find_map(|s| s.identity_scheme())
            .unwrap_or_else(|| codec(family).identity_scheme());
        let clear = stages
            .iter()
            .rev()
            .find_map(|s| s.clear_fields())
            .unwrap_or_else(ClearFields::empty);
        Device {
            kind,
            family,
            scheme,
            clear,
            stages,
            state: DeviceState {
                data,
                options,
                values: HashMap::new(),
                settings,
                store,
                pairing: false,
                token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            },
            active: false,
        }
    }

    /// Temporary, already active device used by the pairing wizard
    pub fn pair_instance(kind: DeviceKind, data: Record, options: DeviceOptions) -> Self {
        let mut device = Self::new(kind, data, options, new_store(), new_store());
        device.state.pairing = true;
        device.active = true;
        device
    }

    /// Device type
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Frame family used by this device
    pub fn family(&self) -> Family {
        self.family
    }

    /// Device id from the pairing data
    pub fn id(&self) -> Option<&str> {
        self.state.data.id.as_deref()
    }

    /// Unique token, the owner of every timer this device schedules
    pub fn token(&self) -> u64 {
        self.state.token
    }

    /// Pairing data
    pub fn data(&self) -> &Record {
        &self.state.data
    }

    /// True for a pairing wizard instance
    pub fn is_pairing(&self) -> bool {
        self.state.pairing
    }

    /// True between [`Device::activate`] and [`Device::deactivate`]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Last value of `capability`
    pub fn capability_value(&self, capability: Capability) -> Option<CapabilityValue> {
        self.state.values.get(&capability).copied()
    }

    /// Last frame accepted by the device
    pub fn last_frame(&self) -> Option<&Record> {
        self.stages.iter().find_map(|s| s.last_frame())
    }

    /// Starts handling frames and timers. Old protocol identities are registered.
    pub fn activate(&mut self, registry: &mut IdentityRegistry) {
        if self.family == Family::Old12 && !self.state.pairing {
            if let Some(id) = &self.state.data.id {
                registry.register(id);
            }
        }
        self.active = true;
        debug!("Activated {:?} device {}", self.kind, self.state.id());
    }

    /// Cancels every timer; nothing fires for this device afterwards
    pub fn deactivate(&mut self, scheduler: &mut dyn Scheduler) {
        let mut ctx = StageContext {
            device: &mut self.state,
            scheduler,
        };
        for stage in self.stages.iter_mut() {
            stage.deactivate(&mut ctx);
        }
        self.active = false;
        debug!("Deactivated device {}", self.state.id());
    }

    /// Decodes with the device family and assigns the identity
    pub fn decode(&self, frame: &Frame) -> Option<Record> {
        let mut record = codec(self.family).decode(frame)?;
        record.id = identity::derive(&record, self.scheme);
        Some(record)
    }

    /// True if `record` is addressed to this device, directly or through a group frame
    pub fn matches(&self, record: &Record) -> bool {
        let data = &self.state.data;
        match &data.id {
            None => self.state.pairing,
            Some(id) => {
                record.id.as_ref() == Some(id)
                    || (record.group == Some(1) && record.address == data.address)
            }
        }
    }

    /// Full receive path for a raw frame
    pub fn receive(&mut self, scheduler: &mut dyn Scheduler, frame: &Frame) -> Option<Received> {
        let record = self.decode(frame)?;
        if !self.matches(&record) {
            return None;
        }
        self.handle_record(scheduler, record)
    }

    /// Runs a decoded record through the stages and applies its capability values
    pub fn handle_record(
        &mut self,
        scheduler: &mut dyn Scheduler,
        record: Record,
    ) -> Option<Received> {
        if !self.active {
            return None;
        }
        let mut ctx = StageContext {
            device: &mut self.state,
            scheduler,
        };
        let mut record = record;
        for stage in self.stages.iter_mut() {
            record = match stage.inbound(&mut ctx, record) {
                Some(r) => r,
                None => {
                    trace!("Frame rejected by {}", stage.name());
                    return None;
                }
            };
        }
        finish(&mut self.stages, &mut ctx, record)
    }

    /// Sets a capability from the host, returning the frames to transmit
    pub fn write_capability(
        &mut self,
        scheduler: &mut dyn Scheduler,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<Vec<Frame>> {
        let mut record = Record::default();
        record.set_capability(capability, value);
        let frames = self.send(scheduler, record)?;
        let mut ctx = StageContext {
            device: &mut self.state,
            scheduler,
        };
        set_value(&mut self.stages, &mut ctx, capability, value);
        Ok(frames)
    }

    /// Builds the frames for `record` on top of the stored device data
    pub fn send(&mut self, scheduler: &mut dyn Scheduler, record: Record) -> Result<Vec<Frame>> {
        let first = self.encode(scheduler, record)?;
        let extra: Vec<Record> = self
            .stages
            .iter_mut()
            .flat_map(|s| s.after_send(&first.1))
            .collect();
        let mut frames = vec![first.0];
        for record in extra {
            frames.push(self.encode(scheduler, record)?.0);
        }
        Ok(frames)
    }

    fn encode(&mut self, scheduler: &mut dyn Scheduler, record: Record) -> Result<(Frame, Record)> {
        let mut send = self.state.data.clone();
        self.clear.apply(&mut send);
        send.overlay(&record);

        let mut ctx = StageContext {
            device: &mut self.state,
            scheduler,
        };
        for stage in self.stages.iter_mut().rev() {
            send = stage.outbound(&mut ctx, send);
        }
        match codec(self.family).encode(&send) {
            Some(frame) => {
                trace!("Sending {} for {:?}", frame, send);
                Ok((frame, send))
            }
            None => {
                warn!("Record not sendable: {:?}", send);
                Err(KakuError::NotSendable(self.family))
            }
        }
    }

    /// Sends the program signal of the pairing wizard, always with state on
    pub fn program_signal(
        &mut self,
        scheduler: &mut dyn Scheduler,
        mut record: Record,
    ) -> Result<Vec<Frame>> {
        record.state = Some(1);
        record.onoff = None;
        self.send(scheduler, record)
    }

    /// Device object for the pairing wizard
    pub fn assemble(&self) -> Result<DeviceExport> {
        let mut export = DeviceExport {
            data: self.state.data.clone(),
            capabilities: self.state.options.capabilities.clone(),
        };
        for stage in &self.stages {
            stage.export(&self.state, &mut export)?;
        }
        Ok(export)
    }

    /// Delivers a fired timer. Stale timers and timers after deactivation are ignored.
    pub fn timer_fired(
        &mut self,
        scheduler: &mut dyn Scheduler,
        id: TimerId,
        timer: &Timer,
    ) -> Option<Received> {
        if !self.active {
            warn!("Timer {:?} fired for inactive device", id);
            return None;
        }
        let mut ctx = StageContext {
            device: &mut self.state,
            scheduler,
        };
        let mut synthesized = None;
        for stage in self.stages.iter_mut() {
            if let Some(record) = stage.timer_fired(&mut ctx, id, &timer.kind) {
                synthesized = Some(record);
            }
        }
        let record = synthesized?;
        finish(&mut self.stages, &mut ctx, record)
    }

    /// True if the trigger arguments match `record`
    pub fn flow_trigger_matches(&self, args: &FlowArgs, record: &Record) -> bool {
        let mut args = args.clone();
        for stage in self.stages.iter().rev() {
            stage.map_flow_args(&self.state, &mut args);
        }
        args.matches(record)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::{Dim, WindowCoveringsState};
    use crate::settings::{TimeoutSpec, ToggleTimeout, ROTATED};
    use crate::timer::VirtualScheduler;
    use std::time::Duration;

    const ADDRESS: &str = "01110001110100101001100110";

    fn frame(group: u8, state: u8, unit: &str) -> Frame {
        format!("{}{}{}00{}", ADDRESS, group, state, unit)
            .parse()
            .unwrap()
    }

    fn dim_frame(nibble: &str) -> Frame {
        format!("{}0f0001{}", ADDRESS, nibble).parse().unwrap()
    }

    fn data(unit: &str, scheme: IdentityScheme) -> Record {
        let mut data = Record {
            address: Some(ADDRESS.into()),
            channel: Some("00".into()),
            unit: Some(unit.into()),
            group: Some(0),
            state: Some(0),
            ..Default::default()
        };
        data.id = identity::derive(&data, scheme);
        data
    }

    fn device(kind: DeviceKind, data: Record, options: DeviceOptions) -> Device {
        device_with(kind, data, options, HashMap::new())
    }

    fn device_with(
        kind: DeviceKind,
        data: Record,
        options: DeviceOptions,
        settings: HashMap<String, SettingValue>,
    ) -> Device {
        let mut device = Device::new(kind, data, options, Box::new(settings), new_store());
        device.activate(&mut IdentityRegistry::new());
        device
    }

    fn options(capabilities: &[Capability]) -> DeviceOptions {
        DeviceOptions {
            capabilities: capabilities.to_vec(),
            ..Default::default()
        }
    }

    fn fire(device: &mut Device, s: &mut VirtualScheduler, by: Duration) -> Vec<Received> {
        let mut received = Vec::new();
        for (id, timer) in s.advance(by) {
            received.extend(device.timer_fired(s, id, &timer));
        }
        received
    }

    #[test]
    fn identity_does_not_depend_on_state() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::OnOff]),
        );
        let on = d.receive(&mut s, &frame(0, 1, "01")).unwrap();
        let off = d.receive(&mut s, &frame(0, 0, "01")).unwrap();
        assert_eq!(on.record.id, off.record.id);
        assert_eq!(Some(format!("{}:00:01", ADDRESS)), on.record.id);
        assert_eq!(
            Some(CapabilityValue::Bool(false)),
            d.capability_value(Capability::OnOff)
        );
        assert!(d.receive(&mut s, &frame(0, 1, "10")).is_none());
    }

    #[test]
    fn group_frame_is_attributed_to_device() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::OnOff]),
        );
        d.receive(&mut s, &frame(0, 0, "01")).unwrap();
        let r = d.receive(&mut s, &frame(1, 1, "00")).unwrap();
        assert_eq!(d.id().map(str::to_string), r.record.id);
        assert_eq!(Some("01".to_string()), r.record.unit);

        let last = d.last_frame().unwrap();
        assert_eq!(Some(1), last.group);
        assert_eq!(Some("01".to_string()), last.unit);
        assert_eq!(Some(0), last.state);
    }

    #[test]
    fn toggle_reverts_once() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            DeviceOptions {
                toggle_timeout: Some(ToggleTimeout::Fixed(TimeoutSpec::Millis(5000))),
                ..options(&[Capability::OnOff])
            },
        );
        let on = CapabilityValue::Bool(true);
        let frames = d.write_capability(&mut s, Capability::OnOff, on).unwrap();
        assert_eq!(vec![frame(0, 1, "01")], frames);
        assert_eq!(1, s.pending());

        d.write_capability(&mut s, Capability::OnOff, on).unwrap();
        assert_eq!(1, s.pending());

        assert!(fire(&mut d, &mut s, Duration::from_millis(4999)).is_empty());
        let reverted = fire(&mut d, &mut s, Duration::from_millis(1));
        assert_eq!(1, reverted.len());
        assert_eq!(Some(false), reverted[0].record.onoff);
        assert_eq!(Some(0), reverted[0].record.state);
        assert_eq!(
            Some(CapabilityValue::Bool(false)),
            d.capability_value(Capability::OnOff)
        );
        assert_eq!(0, s.pending());
        assert!(fire(&mut d, &mut s, Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn toggle_rearms_on_opposite_value() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            DeviceOptions {
                toggle_timeout: Some(ToggleTimeout::Fixed(TimeoutSpec::Millis(5000))),
                ..options(&[Capability::OnOff])
            },
        );
        d.write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(true))
            .unwrap();
        fire(&mut d, &mut s, Duration::from_millis(3000));
        d.receive(&mut s, &frame(0, 0, "01")).unwrap();
        assert_eq!(1, s.pending());

        assert!(fire(&mut d, &mut s, Duration::from_millis(2500)).is_empty());
        let reverted = fire(&mut d, &mut s, Duration::from_millis(2500));
        assert_eq!(Some(true), reverted[0].record.onoff);
    }

    #[test]
    fn deactivate_cancels_timers() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            DeviceOptions {
                toggle_timeout: Some(ToggleTimeout::Fixed(TimeoutSpec::Millis(5000))),
                ..options(&[Capability::OnOff])
            },
        );
        d.write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(true))
            .unwrap();
        let stale = s.advance(Duration::from_millis(5000));
        d.write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(false))
            .unwrap();
        d.deactivate(&mut s);
        assert!(!d.is_active());
        assert_eq!(0, s.pending());
        for (id, timer) in stale {
            assert!(d.timer_fired(&mut s, id, &timer).is_none());
        }
        assert!(d.receive(&mut s, &frame(0, 1, "01")).is_none());
    }

    #[test]
    fn wall_switch_button_index() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::WallSwitch,
            data("00", IdentityScheme::Address),
            DeviceOptions {
                button_count: 2,
                ..Default::default()
            },
        );
        let r = d.receive(&mut s, &frame(0, 1, "01")).unwrap();
        assert_eq!(Some(1), r.record.button_index);
        assert_eq!(
            Some(0),
            d.receive(&mut s, &frame(0, 1, "00"))
                .unwrap()
                .record
                .button_index
        );
        assert!(d.receive(&mut s, &frame(0, 1, "10")).is_none());
        assert!(d.receive(&mut s, &frame(1, 1, "00")).is_none());

        let record = Record {
            button_index: Some(1),
            state: Some(1),
            ..Default::default()
        };
        assert_eq!(vec![frame(0, 1, "01")], d.send(&mut s, record).unwrap());
    }

    #[test]
    fn wall_switch_rotated_mirrors() {
        let mut s = VirtualScheduler::new();
        let mut settings = HashMap::new();
        settings.insert(ROTATED.to_string(), SettingValue::Text("180".into()));
        let mut d = device_with(
            DeviceKind::WallSwitch,
            data("10", IdentityScheme::Address),
            DeviceOptions {
                button_count: 2,
                ..Default::default()
            },
            settings,
        );
        let r = d.receive(&mut s, &frame(0, 1, "11")).unwrap();
        assert_eq!(Some(0), r.record.button_index);

        let record = Record {
            button_index: Some(0),
            state: Some(0),
            ..Default::default()
        };
        assert_eq!(vec![frame(0, 0, "11")], d.send(&mut s, record).unwrap());
    }

    #[test]
    fn wall_switch_rejects_unknown_button() {
        let mut s = VirtualScheduler::new();
        let mut settings = HashMap::new();
        settings.insert(ROTATED.to_string(), SettingValue::Text("180".into()));
        let mut d = device_with(
            DeviceKind::WallSwitch,
            data("00", IdentityScheme::Address),
            DeviceOptions {
                button_count: 2,
                ..Default::default()
            },
            settings,
        );
        for index in &[2, 5, usize::MAX] {
            let record = Record {
                button_index: Some(*index),
                state: Some(1),
                ..Default::default()
            };
            assert!(matches!(
                d.send(&mut s, record),
                Err(KakuError::NotSendable(Family::P32))
            ));
        }
    }

    #[test]
    fn wall_switch_flow_args() {
        let d = device(
            DeviceKind::WallSwitch,
            data("00", IdentityScheme::Address),
            DeviceOptions {
                button_count: 2,
                ..Default::default()
            },
        );
        let args = FlowArgs {
            unit: Some("01".into()),
            ..Default::default()
        };
        let record = Record {
            button_index: Some(1),
            group: Some(0),
            state: Some(1),
            ..Default::default()
        };
        assert!(d.flow_trigger_matches(&args, &record));
        let other = Record {
            button_index: Some(0),
            ..record
        };
        assert!(!d.flow_trigger_matches(&args, &other));
    }

    #[test]
    fn remote_group_flow_args() {
        let d = device(
            DeviceKind::Remote,
            data("00", IdentityScheme::Address),
            Default::default(),
        );
        let args = FlowArgs {
            unitchannel: Some("g".into()),
            ..Default::default()
        };
        let group = Record {
            unit: Some("00".into()),
            channel: Some("00".into()),
            group: Some(1),
            ..Default::default()
        };
        assert!(d.flow_trigger_matches(&args, &group));
        let single = Record {
            group: Some(0),
            ..group
        };
        assert!(!d.flow_trigger_matches(&args, &single));
    }

    #[test]
    fn remote_unitchannel_flow_args() {
        let d = device(
            DeviceKind::Remote,
            data("00", IdentityScheme::Address),
            Default::default(),
        );
        let args = FlowArgs {
            unitchannel: Some("0110".into()),
            ..Default::default()
        };
        let record = Record {
            unit: Some("01".into()),
            channel: Some("10".into()),
            group: Some(0),
            state: Some(1),
            ..Default::default()
        };
        assert!(d.flow_trigger_matches(&args, &record));
        let other_channel = Record {
            channel: Some("00".into()),
            ..record.clone()
        };
        assert!(!d.flow_trigger_matches(&args, &other_channel));
        let group = Record {
            group: Some(1),
            ..record
        };
        assert!(!d.flow_trigger_matches(&args, &group));
    }

    #[test]
    fn valueline_debounces_group_frames() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::RemoteValueline,
            data("00", IdentityScheme::Address),
            Default::default(),
        );
        assert!(d.receive(&mut s, &frame(1, 1, "00")).is_some());
        assert!(fire(&mut d, &mut s, Duration::from_millis(1999)).is_empty());
        assert!(d.receive(&mut s, &frame(0, 1, "01")).is_none());

        fire(&mut d, &mut s, Duration::from_millis(2));
        assert!(d.receive(&mut s, &frame(0, 1, "01")).is_some());
        assert!(d.receive(&mut s, &frame(0, 0, "01")).is_some());
    }

    #[test]
    fn valueline_repeats_group_sends() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::RemoteValueline,
            data("00", IdentityScheme::Address),
            Default::default(),
        );
        let record = Record {
            group: Some(1),
            onoff: Some(true),
            ..Default::default()
        };
        let frames = d.send(&mut s, record).unwrap();
        assert_eq!(
            vec![frame(1, 1, "00"), frame(0, 1, "00"), frame(0, 1, "01")],
            frames
        );
    }

    #[test]
    fn blinds_direction() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Blinds,
            data("00", IdentityScheme::AddressChannelUnit),
            options(&[Capability::WindowCoveringsState]),
        );
        let up = CapabilityValue::WindowCoverings(WindowCoveringsState::Up);
        let idle = CapabilityValue::WindowCoverings(WindowCoveringsState::Idle);
        let state = |r: Option<Received>| r.unwrap().record.windowcoverings_state;

        assert_eq!(
            vec![frame(0, 1, "00")],
            d.write_capability(&mut s, Capability::WindowCoveringsState, up)
                .unwrap()
        );
        assert_eq!(
            Some(WindowCoveringsState::Idle),
            state(d.receive(&mut s, &frame(0, 1, "00")))
        );
        assert_eq!(
            Some(WindowCoveringsState::Down),
            state(d.receive(&mut s, &frame(0, 0, "00")))
        );
        assert_eq!(
            vec![frame(0, 0, "00")],
            d.write_capability(&mut s, Capability::WindowCoveringsState, idle)
                .unwrap()
        );

        // Idle without a motion repeats the last direction
        assert_eq!(
            vec![frame(0, 0, "00")],
            d.write_capability(&mut s, Capability::WindowCoveringsState, idle)
                .unwrap()
        );
    }

    #[test]
    fn blinds_motion_times_out() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Blinds,
            data("00", IdentityScheme::AddressChannelUnit),
            options(&[Capability::WindowCoveringsState]),
        );
        d.receive(&mut s, &frame(0, 1, "00")).unwrap();
        assert!(fire(&mut d, &mut s, Duration::from_secs(120)).is_empty());
        assert_eq!(0, s.pending());
        let r = d.receive(&mut s, &frame(0, 1, "00")).unwrap();
        assert_eq!(
            Some(WindowCoveringsState::Up),
            r.record.windowcoverings_state
        );
    }

    #[test]
    fn blinds_rotated() {
        let mut s = VirtualScheduler::new();
        let mut settings = HashMap::new();
        settings.insert(ROTATED.to_string(), SettingValue::Text("180".into()));
        let mut d = device_with(
            DeviceKind::Blinds,
            data("00", IdentityScheme::AddressChannelUnit),
            options(&[Capability::WindowCoveringsState]),
            settings,
        );
        let write = |d: &mut Device, s: &mut VirtualScheduler, state| {
            d.write_capability(
                s,
                Capability::WindowCoveringsState,
                CapabilityValue::WindowCoverings(state),
            )
            .unwrap()
        };
        let state = |r: Option<Received>| r.unwrap().record.windowcoverings_state;

        assert_eq!(
            Some(WindowCoveringsState::Down),
            state(d.receive(&mut s, &frame(0, 1, "00")))
        );
        assert_eq!(
            vec![frame(0, 0, "00")],
            write(&mut d, &mut s, WindowCoveringsState::Up)
        );
        // The repeated up frame means the motor stopped
        assert_eq!(
            Some(WindowCoveringsState::Idle),
            state(d.receive(&mut s, &frame(0, 0, "00")))
        );

        write(&mut d, &mut s, WindowCoveringsState::Up);
        assert_eq!(
            vec![frame(0, 0, "00")],
            write(&mut d, &mut s, WindowCoveringsState::Idle)
        );
        assert_eq!(
            vec![frame(0, 1, "00")],
            write(&mut d, &mut s, WindowCoveringsState::Down)
        );
        assert_eq!(
            vec![frame(0, 1, "00")],
            write(&mut d, &mut s, WindowCoveringsState::Idle)
        );
    }

    #[test]
    fn dimmer_sends_fallback_level() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Dimmer,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::OnOff, Capability::Dim]),
        );
        let frames = d
            .write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(true))
            .unwrap();
        assert_eq!(36, frames[0].len());
        assert_eq!(Some(1), frames[0].value(32..36));

        d.write_capability(
            &mut s,
            Capability::Dim,
            CapabilityValue::Dim(Dim::Level(0.6)),
        )
        .unwrap();
        let frames = d
            .write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(true))
            .unwrap();
        assert_eq!(Some(9), frames[0].value(32..36));

        let frames = d
            .write_capability(&mut s, Capability::OnOff, CapabilityValue::Bool(false))
            .unwrap();
        assert_eq!(vec![frame(0, 0, "01")], frames);
    }

    #[test]
    fn doorbell_only_triggers_on_press() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Doorbell,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::AlarmGeneric]),
        );
        let press = d.receive(&mut s, &frame(0, 1, "01")).unwrap();
        assert!(press.trigger_flows);
        assert_eq!(
            Some(CapabilityValue::Bool(true)),
            d.capability_value(Capability::AlarmGeneric)
        );
        let release = d.receive(&mut s, &frame(0, 0, "01")).unwrap();
        assert!(!release.trigger_flows);

        // Inverted sensor: alarm true is sent as state 0
        let frames = d
            .write_capability(
                &mut s,
                Capability::AlarmGeneric,
                CapabilityValue::Bool(true),
            )
            .unwrap();
        assert_eq!(vec![frame(0, 0, "01")], frames);
    }

    #[test]
    fn sensor_fills_alarms_from_state() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Sensor,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::AlarmContact, Capability::AlarmTamper]),
        );
        let r = d.receive(&mut s, &frame(0, 1, "01")).unwrap();
        assert!(r.trigger_flows);
        assert_eq!(
            Some(CapabilityValue::Bool(true)),
            r.record.capability(Capability::AlarmTamper)
        );
        assert_eq!(
            Some(CapabilityValue::Bool(true)),
            d.capability_value(Capability::AlarmContact)
        );
    }

    #[test]
    fn sensor_last_capability_sets_state() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::Sensor,
            data("01", IdentityScheme::AddressChannelUnit),
            options(&[Capability::AlarmContact, Capability::AlarmTamper]),
        );
        let mut record = Record::default();
        record.set_capability(Capability::AlarmContact, CapabilityValue::Bool(true));
        record.set_capability(Capability::AlarmTamper, CapabilityValue::Bool(false));
        assert_eq!(vec![frame(0, 0, "01")], d.send(&mut s, record).unwrap());

        let mut record = Record::default();
        record.set_capability(Capability::AlarmContact, CapabilityValue::Bool(false));
        record.set_capability(Capability::AlarmTamper, CapabilityValue::Bool(true));
        assert_eq!(vec![frame(0, 1, "01")], d.send(&mut s, record).unwrap());

        let mut record = Record::default();
        record.set_capability(Capability::AlarmContact, CapabilityValue::Bool(true));
        assert_eq!(vec![frame(0, 1, "01")], d.send(&mut s, record).unwrap());
    }

    #[test]
    fn dimming_remote_direction() {
        let mut s = VirtualScheduler::new();
        let mut d = device(
            DeviceKind::DimmingRemote,
            data("01", IdentityScheme::Address),
            Default::default(),
        );
        let up = d.receive(&mut s, &dim_frame("1000")).unwrap();
        assert_eq!(Some(true), up.record.dimup);
        assert_eq!(Some(true), up.record.isdim);

        let down = d.receive(&mut s, &dim_frame("0011")).unwrap();
        assert_eq!(Some(false), down.record.dimup);
        let same = d.receive(&mut s, &dim_frame("0011")).unwrap();
        assert_eq!(None, same.record.dimup);
        let full = d.receive(&mut s, &dim_frame("1111")).unwrap();
        assert_eq!(Some(true), full.record.dimup);

        let plain = d.receive(&mut s, &frame(0, 1, "01")).unwrap();
        assert_eq!(Some(false), plain.record.isdim);
        assert_eq!(None, plain.record.dimup);

        let args = FlowArgs {
            state: Some(crate::flow::FlowState::DimUp),
            ..Default::default()
        };
        assert!(d.flow_trigger_matches(&args, &full.record));
        assert!(!d.flow_trigger_matches(&args, &down.record));
    }

    #[test]
    fn pairing_export() {
        let mut pairing = Device::pair_instance(
            DeviceKind::Dimmer,
            Record {
                state: Some(1),
                group: Some(1),
                ..data("01", IdentityScheme::AddressChannelUnit)
            },
            options(&[Capability::OnOff, Capability::Dim]),
        );
        assert!(matches!(
            pairing.assemble(),
            Err(KakuError::CannotPairWithGroupButton)
        ));

        pairing = Device::pair_instance(
            DeviceKind::Dimmer,
            Record {
                state: Some(1),
                ..data("01", IdentityScheme::AddressChannelUnit)
            },
            options(&[Capability::OnOff, Capability::Dim]),
        );
        let export = pairing.assemble().unwrap();
        assert_eq!(Some(0), export.data.group);
        assert_eq!(Some(1), export.data.state);
        assert_eq!(Some(Dim::Level(1.0)), export.data.dim);
    }

    #[test]
    fn pairing_accepts_any_frame() {
        let mut s = VirtualScheduler::new();
        let mut pairing =
            Device::pair_instance(DeviceKind::Switch, Record::default(), Default::default());
        assert!(pairing.is_pairing());
        let r = pairing.receive(&mut s, &frame(0, 1, "11")).unwrap();
        assert_eq!(Some(format!("{}:00:11", ADDRESS)), r.record.id);
    }

    #[test]
    fn program_signal_is_always_on() {
        let mut s = VirtualScheduler::new();
        let mut pairing = Device::pair_instance(
            DeviceKind::Switch,
            data("01", IdentityScheme::AddressChannelUnit),
            Default::default(),
        );
        let record = Record {
            onoff: Some(false),
            state: Some(0),
            ..Default::default()
        };
        let frames = pairing.program_signal(&mut s, record).unwrap();
        assert_eq!(vec![frame(0, 1, "01")], frames);
    }

    #[test]
    fn unsendable_record() {
        let mut s = VirtualScheduler::new();
        let mut d = device(DeviceKind::Switch, Record::default(), Default::default());
        assert!(matches!(
            d.send(&mut s, Record::default()),
            Err(KakuError::NotSendable(Family::P32))
        ));
    }

    #[test]
    fn old_switch_registers_identity() {
        let mut registry = IdentityRegistry::new();
        let data = Record {
            id: Some("0101:0000:0110".into()),
            ..Default::default()
        };
        let mut d = Device::new(
            DeviceKind::OldSwitch,
            data.clone(),
            Default::default(),
            new_store(),
            new_store(),
        );
        assert_eq!(Family::Old12, d.family());
        d.activate(&mut registry);
        assert!(registry.contains("0101:0000:0110"));

        let mut pairing = Device::pair_instance(DeviceKind::OldSwitch, data, Default::default());
        let mut other = IdentityRegistry::new();
        pairing.activate(&mut other);
        assert!(other.is_empty());
    }
}
