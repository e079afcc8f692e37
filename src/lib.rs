//! Library for 433 MHz KaKu (KlikAanKlikUit) remote control frames.
//!
//! Decodes and encodes the tri-state frames of the old codewheel protocol and the
//! self-learning protocols, and runs the per device type behavior on top of them: button
//! indexing, dim gestures, blind direction, debounced group frames and timed reversion.
//!
//! # Example
//! ```no_run
//! use kakurf::pipeline::{DeviceKind, DeviceOptions};
//! use kakurf::identity::{self, IdentityScheme};
//! use kakurf::*;
//! use std::collections::HashMap;
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> kakurf::Result<()> {
//!     let mut data = identity::generate_data(&mut rand::thread_rng());
//!     data.id = identity::derive(&data, IdentityScheme::AddressChannelUnit);
//!
//!     let mut host = Host::new();
//!     host.add_device(Device::new(
//!         DeviceKind::Switch,
//!         data,
//!         DeviceOptions {
//!             capabilities: vec![Capability::OnOff],
//!             ..Default::default()
//!         },
//!         Box::new(HashMap::<String, settings::SettingValue>::new()),
//!         Box::new(HashMap::<String, settings::SettingValue>::new()),
//!     ));
//!
//!     // frames_tx is fed by the radio receiver, out_rx drained by the transmitter
//!     let (frames_tx, frames_rx) = unbounded_channel();
//!     let (commands_tx, commands_rx) = unbounded_channel();
//!     let (out_tx, out_rx) = unbounded_channel();
//!     let (events_tx, mut events_rx) = unbounded_channel();
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events_rx.recv().await {
//!             println!("Received {:?}", event);
//!         }
//!     });
//!
//!     host.run(frames_rx, commands_rx, out_tx, events_tx).await?;
//!     drop((frames_tx, commands_tx, out_rx));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Result type used by the library
pub type Result<T> = std::result::Result<T, KakuError>;

pub mod codec;
mod device;
mod error;
mod families;
mod flow;
mod frame;
mod host;
pub mod identity;
pub mod pipeline;
mod record;
pub mod settings;
pub mod timer;

pub use device::{Device, Received};
pub use error::{KakuError, ValidationError};
pub use families::{Families, Family};
pub use flow::{FlowArgs, FlowState};
pub use frame::{bit_string, Frame, Symbol};
pub use host::{Host, HostCommand, HostEvent};
pub use record::{Capability, CapabilityValue, Dim, Record, WindowCoveringsState};
