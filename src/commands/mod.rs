//! Instrument-level command sets built on top of a [Link](crate::Link)
//!
//! Most line-oriented instruments expose a list of queries (`*IDN?`, `:Laser:Current?`) and
//! settings (`:Laser:Current 1.500`). [device_commands!](crate::device_commands) turns such a
//! list into a trait with one method per command, implemented for every [SerialDevice].

#[macro_use]
mod macros;

use crate::{device::SerialComm, Link, Result};

/// A device that answers text commands
pub trait SerialDevice {
    /// Send `message` and return the device's normalized response
    fn send_message(&mut self, message: &str) -> Result<String>;
}

impl<T: SerialComm> SerialDevice for Link<T> {
    fn send_message(&mut self, message: &str) -> Result<String> {
        self.send(message)
    }
}

impl<D: SerialDevice + ?Sized> SerialDevice for &mut D {
    fn send_message(&mut self, message: &str) -> Result<String> {
        (**self).send_message(message)
    }
}
