use crate::families::Family;
use thiserror::Error;

#[derive(Error, Debug)]
/// Error type for the library
pub enum KakuError {
    /// A raw transport byte is not one of 0, 1 or 2 (float)
    #[error("Invalid frame symbol: {0}")]
    InvalidSymbol(u8),
    /// A textual frame contains something other than `0`, `1` or `f`
    #[error("Invalid frame character: {0:?}")]
    InvalidFrameText(char),
    /// Pairing was attempted with the group button of a transmitter
    #[error("Cannot pair with a group control")]
    CannotPairWithGroupButton,
    /// The record lacks fields needed to build a frame for the family
    #[error("Record is not sendable with the {0:?} protocol")]
    NotSendable(Family),
    /// No device with the given id is known
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
    /// Sent when the host is shut down
    #[error("System was shutdown during operation")]
    Shutdown,
    /// Channel error
    #[error("Tokio send error: {0}")]
    TokioSendError(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Field level problems found by the strict old protocol validation
pub enum ValidationError {
    /// Address is missing or not 4 bits
    #[error("Wrong address size")]
    WrongAddressSize,
    /// Channel is missing or not 2 bits
    #[error("Wrong channel size")]
    WrongChannelSize,
    /// Unit is missing or not 2 bits
    #[error("Wrong unit size")]
    WrongUnitSize,
    /// Undef is missing or not 3 symbols
    #[error("Wrong undef size")]
    WrongUndefSize,
    /// Neither state nor onoff is set
    #[error("State undefined")]
    StateUndefined,
}
