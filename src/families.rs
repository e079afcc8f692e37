#![allow(missing_docs)]
use bitflags::bitflags;

/// The frame layouts understood by the codecs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// 12 bit codewheel protocol
    Old12,
    /// 32 bit self-learning protocol
    P32,
    /// 32 bit protocol extended with a dim nibble
    P36Dim,
    /// Remote flavour of the dim protocol, absolute levels and up/down gestures
    P36DimRemote,
}

impl Family {
    /// All families in the order they are tried
    pub const ALL: [Family; 4] = [
        Family::Old12,
        Family::P32,
        Family::P36Dim,
        Family::P36DimRemote,
    ];
}

bitflags! {
    /// Set of enabled families
    pub struct Families:u8 {
        /// Codewheel switches
        const OLD_12 = 1<<0;
        /// Self-learning switches, remotes and sensors
        const P32 = 1<<1;
        /// Dimmers
        const P36_DIM = 1<<2;
        /// Dimming remotes
        const P36_DIM_REMOTE = 1<<3;
    }
}

impl From<Family> for Families {
    fn from(family: Family) -> Self {
        match family {
            Family::Old12 => Families::OLD_12,
            Family::P32 => Families::P32,
            Family::P36Dim => Families::P36_DIM,
            Family::P36DimRemote => Families::P36_DIM_REMOTE,
        }
    }
}

impl Families {
    /// Enabled families in declaration order
    pub fn families(self) -> impl Iterator<Item = Family> {
        Family::ALL
            .iter()
            .copied()
            .filter(move |f| self.contains(Families::from(*f)))
    }
}
