use std::{io, time::Duration};

use crate::{LinkConfig, Result};

/// An API to communicate with a serial device
///
/// Implementors own the OS handle. Dropping one without calling [close](Self::close) still
/// releases the handle but may leave the line configured for the link.
pub trait SerialComm {
    /// Open the device named by `config` and apply its line settings
    ///
    /// An invalid `config` is rejected before the device is touched.
    fn open(config: &LinkConfig) -> Result<Self>
    where
        Self: Sized;

    /// Write one byte, returning how many bytes the OS accepted
    fn write_byte(&mut self, byte: u8) -> io::Result<usize>;

    /// Wait at most `timeout` for data, returning whether any is available
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize>;

    /// Discard anything received but not read and anything written but not yet sent
    fn purge_buffers(&mut self) -> io::Result<()>;

    /// Discard pending I/O, restore the settings found at open where the backend knows them, and
    /// release the device
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}
