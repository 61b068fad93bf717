use std::{cell::Cell, collections::VecDeque, io, rc::Rc, time::Duration};

use super::SerialComm;
use crate::{LinkConfig, Result};

/// One scripted step of the device side
#[derive(Debug)]
pub enum Step {
    /// Becomes readable and yields these bytes
    Data(Vec<u8>),
    /// Stays quiet for one wait
    Quiet,
    /// The readiness wait fails with this errno
    WaitError(i32),
    /// Becomes readable, but the read fails with this errno
    ReadError(i32),
}

/// In-memory device that replays a script of [Step]s
#[derive(Debug, Default)]
pub struct MockComm {
    pub steps: VecDeque<Step>,
    /// Data handed out on every read once the script runs out
    pub chatter: Option<Vec<u8>>,
    pub written: Vec<u8>,
    /// Fail the write of the byte at this index with the errno
    pub fail_write: Option<(usize, i32)>,
    /// Report the byte at this index as not written, without an OS error
    pub short_write: Option<usize>,
    pub waits: usize,
    pub reads: usize,
    pub purges: usize,
    /// Shared so a test can observe the close after the link gave the mock up
    pub closes: Rc<Cell<usize>>,
}

impl MockComm {
    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl SerialComm for MockComm {
    fn open(config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::default())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<usize> {
        let index = self.written.len();
        if let Some((at, errno)) = self.fail_write {
            if at == index {
                return Err(io::Error::from_raw_os_error(errno));
            }
        }
        if self.short_write == Some(index) {
            return Ok(0);
        }
        self.written.push(byte);
        Ok(1)
    }

    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        self.waits += 1;
        match self.steps.front() {
            Some(Step::Quiet) => {
                self.steps.pop_front();
                Ok(false)
            }
            Some(Step::WaitError(errno)) => {
                let errno = *errno;
                self.steps.pop_front();
                Err(io::Error::from_raw_os_error(errno))
            }
            Some(_) => Ok(true),
            None => Ok(self.chatter.is_some()),
        }
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(data.len());
                data[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::ReadError(errno)) => Err(io::Error::from_raw_os_error(errno)),
            Some(step) => {
                self.steps.push_front(step);
                Ok(0)
            }
            None => {
                let chatter = self.chatter.as_deref().unwrap_or_default();
                let n = chatter.len().min(data.len());
                data[..n].copy_from_slice(&chatter[..n]);
                Ok(n)
            }
        }
    }

    fn purge_buffers(&mut self) -> io::Result<()> {
        self.purges += 1;
        self.steps.retain(|step| !matches!(step, Step::Data(_)));
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}
