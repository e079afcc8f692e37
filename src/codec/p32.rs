//! Self-learning protocol, 32 bits:
//!
//! ```text
//! 01110001110100101001100110  0      1      00       01
//! ---- address (26 bit) ----  group  state  channel  unit
//! ```

use super::{has_bits, FrameCodec};
use crate::frame::{Frame, FrameBuilder, Symbol};
use crate::record::Record;
use num_traits::FromPrimitive;

pub(crate) const FRAME_LEN: usize = 32;
pub(crate) const ADDRESS_LEN: usize = 26;

/// Protocol-32 codec
pub struct Protocol32;

impl FrameCodec for Protocol32 {
    fn decode(&self, frame: &Frame) -> Option<Record> {
        // Trailing symbols beyond the 32 bit frame are ignored
        if frame.len() < FRAME_LEN || frame.has_float(0..FRAME_LEN) {
            return None;
        }
        let state = frame.get(27)? as u8;
        Some(Record {
            address: frame.bits(0..ADDRESS_LEN),
            group: Some(frame.get(26)? as u8),
            state: Some(state),
            onoff: Some(state != 0),
            channel: frame.bits(28..30),
            unit: frame.bits(30..32),
            ..Default::default()
        })
    }

    fn encode(&self, record: &Record) -> Option<Frame> {
        if !sendable(record) {
            return None;
        }
        // onoff wins over a conflicting numeric state
        let state = match record.onoff {
            Some(on) => Symbol::bit(on),
            None => Symbol::from_u8(record.state?)?,
        };
        let frame = FrameBuilder::with_capacity(FRAME_LEN)
            .bits(record.address.as_deref()?)?
            .symbol(Symbol::bit(record.is_group()))
            .symbol(state)
            .bits(record.channel.as_deref()?)?
            .bits(record.unit.as_deref()?)?
            .build();
        Some(frame)
    }
}

/// Address, channel, unit and group are present with the right widths
pub(crate) fn addressable(record: &Record) -> bool {
    has_bits(&record.address, ADDRESS_LEN)
        && has_bits(&record.channel, 2)
        && has_bits(&record.unit, 2)
        && record.group.is_some()
}

fn sendable(record: &Record) -> bool {
    addressable(record) && record.state.is_some()
}
