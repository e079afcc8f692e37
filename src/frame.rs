//! Tri-state frames as delivered by the radio transport.

use crate::{KakuError, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// One transmitted bit position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum Symbol {
    /// Logical zero
    Zero = 0,
    /// Logical one
    One = 1,
    /// Unconstrained bit, used for group addressing and the dim marker
    Float = 2,
}

impl Symbol {
    /// Symbol for a boolean bit
    pub fn bit(on: bool) -> Self {
        if on {
            Symbol::One
        } else {
            Symbol::Zero
        }
    }

    fn as_char(self) -> char {
        match self {
            Symbol::Zero => '0',
            Symbol::One => '1',
            Symbol::Float => 'f',
        }
    }
}

/// Fixed width sequence of [`Symbol`]s
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame(Vec<Symbol>);

impl Frame {
    /// Converts raw transport bytes, 0, 1 and 2 (float).
    pub fn from_raw(data: &[u8]) -> Result<Self> {
        data.iter()
            .map(|b| Symbol::from_u8(*b).ok_or(KakuError::InvalidSymbol(*b)))
            .collect::<Result<Vec<_>>>()
            .map(Frame)
    }

    /// Raw transport bytes
    pub fn to_raw(&self) -> Vec<u8> {
        self.0.iter().map(|s| *s as u8).collect()
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero length frame
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbols of the frame
    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    /// Symbol at `index`, if the frame is long enough
    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.0.get(index).copied()
    }

    /// True when any symbol in `range` is [`Symbol::Float`]. Out of range positions count as
    /// not floating.
    pub fn has_float(&self, range: Range<usize>) -> bool {
        self.slice(range).iter().any(|s| *s == Symbol::Float)
    }

    /// True when the whole range exists and is floating
    pub fn all_float(&self, range: Range<usize>) -> bool {
        range.end <= self.0.len() && self.0[range].iter().all(|s| *s == Symbol::Float)
    }

    /// Bit string (`"0101"`) of `range`, `None` if it floats or is out of bounds
    pub fn bits(&self, range: Range<usize>) -> Option<String> {
        if range.end > self.0.len() {
            return None;
        }
        self.0[range]
            .iter()
            .map(|s| match s {
                Symbol::Zero => Some('0'),
                Symbol::One => Some('1'),
                Symbol::Float => None,
            })
            .collect()
    }

    /// Unsigned value of `range`, msb first
    pub fn value(&self, range: Range<usize>) -> Option<u32> {
        self.bits(range)
            .and_then(|b| u32::from_str_radix(&b, 2).ok())
    }

    fn slice(&self, range: Range<usize>) -> &[Symbol] {
        let end = range.end.min(self.0.len());
        let start = range.start.min(end);
        &self.0[start..end]
    }
}

impl From<Vec<Symbol>> for Frame {
    fn from(symbols: Vec<Symbol>) -> Self {
        Frame(symbols)
    }
}

impl FromStr for Frame {
    type Err = KakuError;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(Symbol::Zero),
                '1' => Ok(Symbol::One),
                'f' | 'F' | '2' => Ok(Symbol::Float),
                c => Err(KakuError::InvalidFrameText(c)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Frame)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.0 {
            write!(f, "{}", s.as_char())?;
        }
        Ok(())
    }
}

/// Incrementally assembles a frame for the encoders
#[derive(Default)]
pub(crate) struct FrameBuilder(Vec<Symbol>);

impl FrameBuilder {
    pub(crate) fn with_capacity(n: usize) -> Self {
        FrameBuilder(Vec::with_capacity(n))
    }

    /// Appends a bit string, `None` if it contains anything but `0` and `1`.
    pub(crate) fn bits(mut self, bits: &str) -> Option<Self> {
        for c in bits.chars() {
            self.0.push(match c {
                '0' => Symbol::Zero,
                '1' => Symbol::One,
                _ => return None,
            });
        }
        Some(self)
    }

    /// Appends `value` as a `width` bit number, msb first
    pub(crate) fn number(mut self, value: u32, width: usize) -> Self {
        for i in (0..width).rev() {
            self.0.push(Symbol::bit((value >> i) & 1 == 1));
        }
        self
    }

    pub(crate) fn symbol(mut self, symbol: Symbol) -> Self {
        self.0.push(symbol);
        self
    }

    pub(crate) fn symbols(mut self, symbols: &[Symbol]) -> Self {
        self.0.extend_from_slice(symbols);
        self
    }

    pub(crate) fn build(self) -> Frame {
        Frame(self.0)
    }
}

/// Formats `value` as a zero padded binary string of `width` bits
pub fn bit_string(value: u32, width: usize) -> String {
    format!("{:0width$b}", value, width = width)
}
