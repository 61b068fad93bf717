//! Backends that move bytes to and from the device

mod serial_comm;
pub use serial_comm::SerialComm;

mod settings;
pub use settings::LineSettings;

mod termios_comm;
pub use termios_comm::TermiosPort;

#[cfg(feature = "serialport_comm")]
mod serialport_comm;
#[cfg(feature = "serialport_comm")]
pub use serialport_comm::SerialPort;

#[cfg(test)]
pub(crate) mod mock;
