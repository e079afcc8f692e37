//! Codewheel protocol, 12 bits:
//!
//! ```text
//! 0111  10    01       011    1
//! addr  unit  channel  undef  state
//! ```
//!
//! Floating unit and channel bits address every receiver on the address (group).

use super::FrameCodec;
use crate::error::ValidationError;
use crate::families::Family;
use crate::frame::{bit_string, Frame, FrameBuilder, Symbol};
use crate::record::Record;
use log::{debug, trace};
use num_traits::FromPrimitive;

const FRAME_LEN: usize = 12;

/// Default pass-through bits of generated and codewheel records
pub const DEFAULT_UNDEF: [Symbol; 3] = [Symbol::Zero, Symbol::One, Symbol::One];

/// OldProtocol-12 codec
pub struct OldProtocol12;

impl FrameCodec for OldProtocol12 {
    fn decode(&self, frame: &Frame) -> Option<Record> {
        if frame.len() != FRAME_LEN {
            return None;
        }
        let group = !frame.has_float(0..4) && frame.all_float(4..8) && !frame.has_float(8..12);
        if !group && frame.has_float(0..FRAME_LEN) {
            return None;
        }

        let state = frame.get(11)? as u8;
        let (unit, channel) = if group {
            ("00".to_string(), "00".to_string())
        } else {
            (frame.bits(4..6)?, frame.bits(6..8)?)
        };
        Some(Record {
            address: frame.bits(0..4),
            unit: Some(unit),
            channel: Some(channel),
            group: Some(group as u8),
            undef: Some(frame.symbols()[8..11].to_vec()),
            state: Some(state),
            onoff: Some(state != 0),
            ..Default::default()
        })
    }

    fn encode(&self, record: &Record) -> Option<Frame> {
        if let Err(errors) = validate_data(record) {
            debug!("Record not sendable with {:?}: {:?}", Family::Old12, errors);
            return None;
        }
        let state = match record.onoff {
            Some(on) => Symbol::bit(on),
            None => Symbol::from_u8(record.state?)?,
        };
        let builder = FrameBuilder::with_capacity(FRAME_LEN).bits(record.address.as_deref()?)?;
        let builder = if record.is_group() {
            builder.symbols(&[Symbol::Float; 4])
        } else {
            builder
                .bits(record.unit.as_deref()?)?
                .bits(record.channel.as_deref()?)?
        };
        let frame = builder
            .symbols(record.undef.as_deref()?)
            .symbol(state)
            .build();
        trace!("Encoded old protocol frame {}", frame);
        Some(frame)
    }
}

/// Strict field check for old protocol records, reporting every problem found
pub fn validate_data(record: &Record) -> std::result::Result<(), Vec<ValidationError>> {
    let len = |f: &Option<String>| f.as_ref().map(|s| s.len());
    let mut errors = Vec::new();
    if len(&record.address) != Some(4) {
        errors.push(ValidationError::WrongAddressSize);
    }
    if len(&record.channel) != Some(2) {
        errors.push(ValidationError::WrongChannelSize);
    }
    if len(&record.unit) != Some(2) {
        errors.push(ValidationError::WrongUnitSize);
    }
    if record.undef.as_ref().map(|u| u.len()) != Some(3) {
        errors.push(ValidationError::WrongUndefSize);
    }
    if record.state.is_none() && record.onoff.is_none() {
        errors.push(ValidationError::StateUndefined);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn reversed_bits(value: u32, width: usize) -> String {
    bit_string(value, width).chars().rev().collect()
}

/// Builds a record from the codewheel positions chosen in the pairing wizard.
///
/// Two wheels select address and unit+channel, a single wheel (three units per letter)
/// selects both the address and the unit.
pub fn codewheels_to_data(indexes: &[u32]) -> Option<Record> {
    let (address, unit, channel) = match *indexes {
        [address, unit_channel] => {
            let uc = reversed_bits(unit_channel, 4);
            (
                reversed_bits(address, 4),
                uc[0..2].to_string(),
                uc[2..4].to_string(),
            )
        }
        [index] => (
            reversed_bits(index / 3, 4),
            reversed_bits(index % 3, 2),
            "00".to_string(),
        ),
        _ => return None,
    };
    if address.len() != 4 || unit.len() != 2 {
        return None;
    }
    let id = format!("{}:{}:{}", address, channel, unit);
    Some(Record {
        address: Some(address),
        channel: Some(channel),
        unit: Some(unit),
        undef: Some(DEFAULT_UNDEF.to_vec()),
        state: Some(0),
        id: Some(id),
        ..Default::default()
    })
}
