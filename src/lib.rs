//! Crate for talking to line-oriented RS-232 devices through a POSIX terminal
//!
//! Commands are plain ASCII terminated by a carriage return. A response is whatever the device
//! sends until the line goes quiet; it comes back as a single trimmed line of text.
//!
//! # Usage
//! ```no_run
//! use serial_device::{Link, LinkConfig, Parity, DataBits};
//!
//! fn main() -> Result<(), serial_device::Error> {
//!     let config = LinkConfig::new("/dev/ttyUSB0")
//!         .baud_rate(57_600u32)
//!         .data_bits(DataBits::Seven)
//!         .parity(Parity::Even);
//!     let mut link: Link = Link::open(&config)?;
//!     println!("Identity: {}", link.send("*IDN?")?);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod commands;
pub use commands::SerialDevice;

mod config;
pub use config::{BaudRate, DataBits, LinkConfig, Parity, ReadPolicy, StopBits};

pub mod device;

mod error;
pub use error::{ConfigError, Error, Result, WriteFailure};

mod link;
pub use link::{Link, COMMAND_TERMINATOR, MAX_IDLE_READS, READ_BYTES_TIMEOUT};

mod response;
pub use response::{normalize, ResponseBuffer, RESPONSE_CAPACITY};
