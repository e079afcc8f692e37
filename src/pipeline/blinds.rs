use super::{Stage, StageContext};
use crate::record::{Capability, CapabilityValue, Record, WindowCoveringsState};
use crate::timer::{TimerId, TimerKind};
use log::debug;
use std::time::Duration;

/// Longest run of a blind motor. There is no stop acknowledgment, so a motion is assumed
/// finished after this.
const MOTION_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Window covering direction tracking.
///
/// Every frame means "up" or "down". Receiving the direction that is currently moving a
/// second time means the motor stopped.
#[derive(Debug, Default)]
pub struct Blinds {
    transition: Option<WindowCoveringsState>,
    last_direction: Option<WindowCoveringsState>,
    timer: Option<TimerId>,
}

impl Stage for Blinds {
    fn name(&self) -> &'static str {
        "blinds"
    }

    fn inbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Option<Record> {
        let mut direction = if record.state_on() {
            WindowCoveringsState::Up
        } else {
            WindowCoveringsState::Down
        };
        if ctx.device.rotated() {
            direction = direction.inverted();
        }
        record.windowcoverings_state = if self.transition == Some(direction) {
            Some(WindowCoveringsState::Idle)
        } else {
            Some(direction)
        };
        Some(record)
    }

    fn outbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Record {
        let rotated = ctx.device.rotated();
        let mut wanted = record.windowcoverings_state.take();

        if wanted == Some(WindowCoveringsState::Idle) {
            match self.transition {
                // Repeating the moving direction stops the motor
                Some(moving) => {
                    let up = if rotated {
                        WindowCoveringsState::Down
                    } else {
                        WindowCoveringsState::Up
                    };
                    record.state = Some((moving == up) as u8);
                }
                None => {
                    let direction = self.last_direction.unwrap_or(WindowCoveringsState::Up);
                    self.transition = Some(direction);
                    wanted = Some(direction);
                }
            }
        }
        if !ctx.device.pairing && rotated {
            wanted = wanted.map(WindowCoveringsState::inverted);
        }
        match wanted {
            Some(WindowCoveringsState::Idle) | None => {}
            Some(direction) => {
                record.state = Some((direction == WindowCoveringsState::Up) as u8);
            }
        }
        record
    }

    fn capability_written(
        &mut self,
        ctx: &mut StageContext<'_>,
        capability: Capability,
        value: CapabilityValue,
    ) {
        let value = match (capability, value) {
            (Capability::WindowCoveringsState, CapabilityValue::WindowCoverings(v)) => v,
            _ => return,
        };
        if let Some(id) = self.timer.take() {
            ctx.scheduler.cancel(id);
        }
        self.transition = None;
        if value != WindowCoveringsState::Idle {
            debug!("Blind moving {:?}", value);
            self.last_direction = Some(value);
            self.transition = Some(value);
            let timer = ctx.timer(TimerKind::BlindIdle);
            self.timer = Some(ctx.scheduler.schedule(MOTION_TIMEOUT, timer));
        }
    }

    fn timer_fired(
        &mut self,
        _ctx: &mut StageContext<'_>,
        id: TimerId,
        kind: &TimerKind,
    ) -> Option<Record> {
        if *kind == TimerKind::BlindIdle && self.timer == Some(id) {
            debug!("Blind motion {:?} timed out", self.transition);
            self.timer = None;
            self.transition = None;
        }
        None
    }

    fn deactivate(&mut self, ctx: &mut StageContext<'_>) {
        if let Some(id) = self.timer.take() {
            ctx.scheduler.cancel(id);
        }
        self.transition = None;
    }
}
