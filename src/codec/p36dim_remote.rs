//! Dimming remote protocol: plain 32 bit on/off frames plus 36 bit dim frames carrying an
//! absolute level or a relative up/down gesture.

use super::p32::{addressable, FRAME_LEN as P32_LEN};
use super::p36dim::{decode_dim_frame, encode_dim_frame, is_dim_frame, level_nibble};
use super::{FrameCodec, Protocol32};
use crate::frame::{Frame, FrameBuilder, Symbol};
use crate::identity::IdentityScheme;
use crate::record::{Dim, Record};
use num_traits::FromPrimitive;

/// Protocol-36DimRemote codec
pub struct Protocol36DimRemote;

impl FrameCodec for Protocol36DimRemote {
    fn decode(&self, frame: &Frame) -> Option<Record> {
        if frame.len() == P32_LEN && !frame.has_float(0..P32_LEN) {
            let mut record = Protocol32.decode(frame)?;
            record.isdim = Some(false);
            return Some(record);
        }
        if !is_dim_frame(frame) {
            return None;
        }
        let (mut record, nibble) = decode_dim_frame(frame)?;
        record.state = Some(1);
        record.dim = Some(Dim::Level(nibble as f64 / 15.0));
        record.isdim = Some(true);
        Some(record)
    }

    fn encode(&self, record: &Record) -> Option<Frame> {
        if !addressable(record) {
            return None;
        }
        match record.dim {
            Some(Dim::Up) => encode_dim_frame(record, 15),
            Some(Dim::Down) => encode_dim_frame(record, 0),
            // Any non-zero level is a dim frame, clamped to the nibble range
            Some(Dim::Level(level)) if level != 0.0 && !level.is_nan() => {
                encode_dim_frame(record, level_nibble(level))
            }
            dim => {
                let zero = dim.and_then(Dim::level) == Some(0.0);
                let state = match record.state {
                    Some(2) | None if zero => 0,
                    Some(2) | None => return None,
                    Some(state) => state,
                };
                let frame = FrameBuilder::with_capacity(P32_LEN)
                    .bits(record.address.as_deref()?)?
                    .symbol(Symbol::bit(record.is_group()))
                    .symbol(Symbol::from_u8(state)?)
                    .bits(record.channel.as_deref()?)?
                    .bits(record.unit.as_deref()?)?
                    .build();
                Some(frame)
            }
        }
    }

    fn identity_scheme(&self) -> IdentityScheme {
        IdentityScheme::Address
    }
}
