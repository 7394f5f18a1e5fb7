// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Driver configuration and the fixed CLI argument set.
pub mod config;
/// The driver itself.
pub mod driver;
/// Error types for driver operations.
pub mod error;
/// Typed events emitted on the driver channel.
pub mod event;
/// Idempotent kill signalling.
pub mod kill;

pub use config::{build_args, DriverConfig, DEFAULT_TIMEOUT};
pub use driver::CliDriver;
pub use error::DriverError;
pub use event::DriverEvent;
pub use kill::KillSwitch;
