//! Dimmer protocol. A 32 bit frame where the state bit floats, followed by a dim nibble:
//!
//! ```text
//! [address 26][group][f][channel 2][unit 2][dim 4]
//! ```
//!
//! Frames without any floating symbol are plain [`Protocol32`] frames.

use super::p32::{addressable, ADDRESS_LEN, FRAME_LEN as P32_LEN};
use super::{FrameCodec, Protocol32};
use crate::frame::{Frame, FrameBuilder, Symbol};
use crate::record::{Dim, Record};
use log::trace;

pub(crate) const FRAME_LEN: usize = 36;
pub(crate) const MARKER: usize = 27;

/// True for a 36 bit frame whose only floating symbol is the dim marker
pub(crate) fn is_dim_frame(frame: &Frame) -> bool {
    frame.len() == FRAME_LEN
        && !frame.has_float(0..ADDRESS_LEN)
        && !frame.has_float(MARKER + 1..FRAME_LEN)
        && frame.get(MARKER) == Some(Symbol::Float)
}

/// Fields shared by both dim layouts, without state or dim
pub(crate) fn decode_dim_frame(frame: &Frame) -> Option<(Record, u32)> {
    let record = Record {
        address: frame.bits(0..ADDRESS_LEN),
        group: Some(frame.get(26)? as u8),
        channel: frame.bits(28..30),
        unit: frame.bits(30..32),
        ..Default::default()
    };
    Some((record, frame.value(P32_LEN..FRAME_LEN)?))
}

/// Layout with the dim marker and `nibble`
pub(crate) fn encode_dim_frame(record: &Record, nibble: u32) -> Option<Frame> {
    let frame = FrameBuilder::with_capacity(FRAME_LEN)
        .bits(record.address.as_deref()?)?
        .symbol(Symbol::bit(record.is_group()))
        .symbol(Symbol::Float)
        .bits(record.channel.as_deref()?)?
        .bits(record.unit.as_deref()?)?
        .number(nibble, 4)
        .build();
    trace!("Encoded dim frame {}", frame);
    Some(frame)
}

/// Nibble for an absolute level, clamped to `[0, 1]`
pub(crate) fn level_nibble(level: f64) -> u32 {
    (level.max(0.0).min(1.0) * 15.0).round() as u32
}

/// Protocol-36Dim codec
pub struct Protocol36Dim;

impl FrameCodec for Protocol36Dim {
    fn decode(&self, frame: &Frame) -> Option<Record> {
        if !frame.has_float(0..frame.len()) {
            return Protocol32.decode(frame);
        }
        if !is_dim_frame(frame) {
            return None;
        }
        let (mut record, nibble) = decode_dim_frame(frame)?;
        // No state, a dim frame says nothing reliable about on/off
        record.onoff = Some(true);
        record.dim = Some(Dim::Level((nibble as f64 / 15.0 * 10.0).round() / 10.0));
        Some(record)
    }

    fn encode(&self, record: &Record) -> Option<Frame> {
        match record.dim {
            Some(Dim::Level(level)) if level > 0.0 && level <= 1.0 && addressable(record) => {
                encode_dim_frame(record, level_nibble(level))
            }
            Some(Dim::Level(level)) if level == 0.0 => {
                let mut off = record.clone();
                off.onoff = Some(false);
                Protocol32.encode(&off)
            }
            _ => Protocol32.encode(record),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDRESS: &str = "01110001110100101001100110";

    fn record(dim: Option<Dim>) -> Record {
        Record {
            address: Some(ADDRESS.into()),
            channel: Some("00".into()),
            unit: Some("10".into()),
            group: Some(0),
            state: Some(1),
            dim,
            ..Default::default()
        }
    }

    #[test]
    fn plain_frames_match_protocol32() {
        let frame: Frame = format!("{}010010{}", ADDRESS, "1010").parse().unwrap();
        assert_eq!(Protocol32.decode(&frame), Protocol36Dim.decode(&frame));
        assert!(Protocol36Dim.decode(&frame).is_some());
    }

    #[test]
    fn decode_dim() {
        let frame: Frame = format!("{}0f00101010", ADDRESS).parse().unwrap();
        let r = Protocol36Dim.decode(&frame).unwrap();
        assert_eq!(Some(Dim::Level(0.7)), r.dim);
        assert_eq!(Some(true), r.onoff);
        assert_eq!(None, r.state);
        assert_eq!(Some("10".to_string()), r.unit);
    }

    #[test]
    fn decode_rejects_misplaced_float() {
        let frame: Frame = format!("{}f000101010", ADDRESS).parse().unwrap();
        assert!(Protocol36Dim.decode(&frame).is_none());
        let frame: Frame = format!("{}0f0010101f", ADDRESS).parse().unwrap();
        assert!(Protocol36Dim.decode(&frame).is_none());
        let frame: Frame = format!("{}0f001010", ADDRESS).parse().unwrap();
        assert!(Protocol36Dim.decode(&frame).is_none());
    }

    #[test]
    fn encode_level() {
        let frame = Protocol36Dim.encode(&record(Some(Dim::Level(0.5)))).unwrap();
        assert_eq!(format!("{}0f00101000", ADDRESS), frame.to_string());
    }

    #[test]
    fn encode_zero_turns_off() {
        let frame = Protocol36Dim.encode(&record(Some(Dim::Level(0.0)))).unwrap();
        assert_eq!(32, frame.len());
        assert_eq!(Some(Symbol::Zero), frame.get(27));
    }

    #[test]
    fn encode_without_dim_is_plain() {
        let frame = Protocol36Dim.encode(&record(None)).unwrap();
        assert_eq!(Protocol32.encode(&record(None)), Some(frame));
        let frame = Protocol36Dim.encode(&record(Some(Dim::Level(1.5)))).unwrap();
        assert_eq!(32, frame.len());
    }
}
