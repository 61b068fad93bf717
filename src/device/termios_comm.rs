use std::{io, os::fd::OwnedFd, time::Duration};

use log::{debug, info};
use rustix::{
    event::{poll, PollFd, PollFlags},
    fs::{open, Mode, OFlags},
    termios::{tcflush, tcgetattr, tcsetattr, OptionalActions, QueueSelector, Termios},
};

use super::{settings::LineSettings, serial_comm::SerialComm};
use crate::{Error, LinkConfig, Result};

/// A terminal device driven directly through termios
///
/// /dev/tty* or similar on unix-like systems. The settings found on the line when it was opened
/// are kept and put back by [close](SerialComm::close).
pub struct TermiosPort {
    fd: OwnedFd,
    original_settings: Termios,
    active_settings: Termios,
}

impl TermiosPort {
    /// Take over an already-open terminal descriptor and configure it
    ///
    /// The descriptor is closed again if configuring it fails.
    pub fn from_fd(fd: OwnedFd, settings: &LineSettings) -> io::Result<Self> {
        let original_settings = tcgetattr(&fd)?;

        let mut active_settings = original_settings.clone();
        settings.apply(&mut active_settings)?;

        tcflush(&fd, QueueSelector::IOFlush)?;
        tcsetattr(&fd, OptionalActions::Now, &active_settings)?;

        // some platforms only pick up a speed change from a second tcsetattr
        settings.apply_speed(&mut active_settings)?;
        tcsetattr(&fd, OptionalActions::Now, &active_settings)?;

        Ok(Self {
            fd,
            original_settings,
            active_settings,
        })
    }

    /// The line settings in place before this port configured the device
    pub fn original_settings(&self) -> &Termios {
        &self.original_settings
    }

    pub fn active_settings(&self) -> &Termios {
        &self.active_settings
    }
}

impl SerialComm for TermiosPort {
    fn open(config: &LinkConfig) -> Result<Self> {
        let settings = LineSettings::from_config(config)?;
        let unavailable = |source: io::Error| Error::DeviceUnavailable {
            path: config.path().to_owned(),
            source,
        };

        let fd = open(
            config.path(),
            OFlags::RDWR | OFlags::NOCTTY | OFlags::NONBLOCK,
            Mode::empty(),
        )
        .map_err(|e| unavailable(e.into()))?;

        let port = Self::from_fd(fd, &settings).map_err(unavailable)?;
        info!(
            "Opened {} at {} baud",
            config.path().display(),
            settings.baud_rate
        );
        Ok(port)
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<usize> {
        Ok(rustix::io::write(&self.fd, &[byte])?)
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let timeout = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let mut fds = [PollFd::new(&self.fd, PollFlags::IN)];
        Ok(poll(&mut fds, timeout)? > 0)
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        Ok(rustix::io::read(&self.fd, data)?)
    }

    fn purge_buffers(&mut self) -> io::Result<()> {
        Ok(tcflush(&self.fd, QueueSelector::IOFlush)?)
    }

    fn close(mut self) -> io::Result<()> {
        let flushed = self.purge_buffers();
        let restored = tcsetattr(&self.fd, OptionalActions::Now, &self.original_settings);
        debug!("close: releasing descriptor");
        // the descriptor is closed when `self` drops, whatever happened above
        flushed.and(restored.map_err(io::Error::from))
    }
}
