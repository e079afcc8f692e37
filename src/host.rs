//! Event loop connecting devices to the radio transport.

use crate::codec::decode_any;
use crate::device::Device;
use crate::families::Families;
use crate::frame::Frame;
use crate::identity::IdentityRegistry;
use crate::record::{Capability, CapabilityValue, Record};
use crate::timer::{Timer, TimerId, TokioScheduler};
use crate::{KakuError, Result};
use log::{debug, error, trace, warn};
use tokio::{
    select,
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
};

/// Requests from the home automation side
#[derive(Clone, Debug, PartialEq)]
pub enum HostCommand {
    /// Set a capability value, sending the corresponding frames
    WriteCapability {
        /// Target device
        device_id: String,
        /// Capability to set
        capability: Capability,
        /// New value
        value: CapabilityValue,
    },
    /// Send a record on top of the device data
    Send {
        /// Target device
        device_id: String,
        /// Fields to send
        record: Record,
    },
}

/// Events for the home automation side
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// A device accepted a frame, or a timer synthesized one
    Data {
        /// Receiving device
        device_id: String,
        /// Record after the device pipeline
        record: Record,
        /// False when automations must not be triggered
        trigger_flows: bool,
    },
}

/// Owns the active devices and their timers.
pub struct Host {
    devices: Vec<Device>,
    registry: IdentityRegistry,
    scheduler: TokioScheduler,
    fired_rx: Option<UnboundedReceiver<(TimerId, Timer)>>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Host without devices
    pub fn new() -> Self {
        let (scheduler, fired_rx) = TokioScheduler::new();
        Host {
            devices: Vec::new(),
            registry: IdentityRegistry::new(),
            scheduler,
            fired_rx: Some(fired_rx),
        }
    }

    /// Old protocol identities in use
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Mutable registry, used when generating pairing data
    pub fn registry_mut(&mut self) -> &mut IdentityRegistry {
        &mut self.registry
    }

    /// Activates and adds a device
    pub fn add_device(&mut self, mut device: Device) {
        device.activate(&mut self.registry);
        self.devices.push(device);
    }

    /// Deactivates and removes the device with `id`
    pub fn remove_device(&mut self, id: &str) -> Option<Device> {
        let pos = self.devices.iter().position(|d| d.id() == Some(id))?;
        let mut device = self.devices.remove(pos);
        device.deactivate(&mut self.scheduler);
        Some(device)
    }

    /// Active devices
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Union of the device families, the receive filter
    pub fn families(&self) -> Families {
        self.devices
            .iter()
            .fold(Families::empty(), |f, d| f | Families::from(d.family()))
    }

    /// Hands a received frame to every device
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<HostEvent> {
        if decode_any(frame, self.families()).is_none() {
            trace!("Ignoring frame {}", frame);
            return Vec::new();
        }
        let mut events = Vec::new();
        for device in self.devices.iter_mut() {
            if let Some(received) = device.receive(&mut self.scheduler, frame) {
                events.push(HostEvent::Data {
                    device_id: device.id().unwrap_or_default().to_string(),
                    record: received.record,
                    trigger_flows: received.trigger_flows,
                });
            }
        }
        events
    }

    /// Executes a command, returning the frames to transmit
    pub fn handle_command(&mut self, cmd: HostCommand) -> Result<Vec<Frame>> {
        debug!("Command {:?}", cmd);
        match cmd {
            HostCommand::WriteCapability {
                device_id,
                capability,
                value,
            } => find_device(&mut self.devices, &device_id)?.write_capability(
                &mut self.scheduler,
                capability,
                value,
            ),
            HostCommand::Send { device_id, record } => {
                find_device(&mut self.devices, &device_id)?.send(&mut self.scheduler, record)
            }
        }
    }

    /// Delivers a fired timer to its owner
    pub fn handle_timer(&mut self, id: TimerId, timer: Timer) -> Option<HostEvent> {
        self.scheduler.fired(id);
        let device = match self.devices.iter_mut().find(|d| d.token() == timer.owner) {
            Some(device) => device,
            None => {
                warn!("Dropping timer {:?} of removed device {}", id, timer.owner);
                return None;
            }
        };
        let received = device.timer_fired(&mut self.scheduler, id, &timer)?;
        Some(HostEvent::Data {
            device_id: device.id().unwrap_or_default().to_string(),
            record: received.record,
            trigger_flows: received.trigger_flows,
        })
    }

    /// Runs until `frames_rx` is closed.
    ///
    /// Received frames are dispatched to the devices, commands are executed and their
    /// frames pushed to `frames_tx`. Records are reported on `events_tx`.
    pub async fn run(
        &mut self,
        frames_rx: UnboundedReceiver<Frame>,
        commands_rx: UnboundedReceiver<HostCommand>,
        frames_tx: UnboundedSender<Frame>,
        events_tx: UnboundedSender<HostEvent>,
    ) -> Result<()> {
        let mut fired_rx = self.fired_rx.take().ok_or(KakuError::Shutdown)?;
        let result = self
            .event_loop(&mut fired_rx, frames_rx, commands_rx, frames_tx, events_tx)
            .await;
        self.fired_rx = Some(fired_rx);
        result
    }

    async fn event_loop(
        &mut self,
        fired_rx: &mut UnboundedReceiver<(TimerId, Timer)>,
        mut frames_rx: UnboundedReceiver<Frame>,
        mut commands_rx: UnboundedReceiver<HostCommand>,
        frames_tx: UnboundedSender<Frame>,
        events_tx: UnboundedSender<HostEvent>,
    ) -> Result<()> {
        loop {
            select! {
                frame = frames_rx.recv() => match frame {
                    // Shutdown if the transport is closed
                    None => return Ok(()),
                    Some(frame) => {
                        for event in self.handle_frame(&frame) {
                            events_tx.send(event)
                                .map_err(|e| KakuError::TokioSendError(format!("{}", e)))?;
                        }
                    }
                },
                Some(cmd) = commands_rx.recv() => match self.handle_command(cmd) {
                    Ok(frames) => {
                        for frame in frames {
                            trace!("Transmitting {}", frame);
                            frames_tx.send(frame)
                                .map_err(|e| KakuError::TokioSendError(format!("{}", e)))?;
                        }
                    }
                    Err(e) => error!("Command failed: {}", e),
                },
                Some((id, timer)) = fired_rx.recv() => {
                    if let Some(event) = self.handle_timer(id, timer) {
                        events_tx.send(event)
                            .map_err(|e| KakuError::TokioSendError(format!("{}", e)))?;
                    }
                }
            }
        }
    }
}

fn find_device<'a>(devices: &'a mut [Device], id: &str) -> Result<&'a mut Device> {
    devices
        .iter_mut()
        .find(|d| d.id() == Some(id))
        .ok_or_else(|| KakuError::UnknownDevice(id.to_string()))
}
