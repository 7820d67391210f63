//! # Sensor Link Simulator
//!
//! Models the radio link between wireless sensor nodes and a receiver:
//! readings are packed into a fixed 8-byte MAC frame with a checksum, issued
//! on a TDMA schedule shared by several sensors, BPSK-modulated, passed
//! through a noisy channel, demodulated and decoded again.
//!
//! ## Quick Start
//!
//! ```rust
//! use sensorlink::frame::{self, FLAG_DATA};
//! use sensorlink::phy::{BpskDemodulator, BpskModulator, ChannelModel};
//! use sensorlink::sensor_frame;
//!
//! let data = sensor_frame::pack(10, -5, 20).unwrap();
//! let bytes = frame::encode(FLAG_DATA, 12, 15, data).unwrap();
//!
//! let signal = BpskModulator::new().modulate(&bytes);
//! let noisy = ChannelModel::new(7).apply(&signal, 0.0).unwrap();
//! let received = BpskDemodulator::new().demodulate(&noisy);
//!
//! // The default decision rule inverts every bit.
//! assert!(bytes.iter().zip(&received).all(|(sent, got)| *got == !*sent));
//! ```
//!
//! ## Architecture
//!
//! - [`frame`] - 8-byte wire frame codec and XOR-fold checksum
//! - [`sensor_frame`] - occupancy / temperature / air-quality payload view
//! - [`sensors`] - sensor sources polled by the scheduler
//! - [`scheduler`] - round-robin TDMA scheduler with cooperative stop
//! - [`transport`] - outbound frame sinks
//! - [`phy`] - BPSK modulation, channel model, demodulation
//! - [`link`] - end-to-end link pipeline and statistics
//! - [`config`] - JSON configuration and setup errors

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod frame;
pub mod link;
pub mod phy;
pub mod scheduler;
pub mod sensor_frame;
pub mod sensors;
pub mod transport;

// Re-export main public types for convenience
pub use config::{ConfigurationError, LinkConfig};
pub use frame::{DecodedFrame, Frame, FrameError};
pub use link::{LinkReport, LinkSimulator};
pub use scheduler::{StopHandle, TdmaScheduler};
pub use sensor_frame::SensorReading;
