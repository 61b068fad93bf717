use std::{io, time::Duration};

use log::{debug, info, trace, warn};

use crate::{
    device::{SerialComm, TermiosPort},
    response::{ResponseBuffer, RESPONSE_CAPACITY},
    Error, LinkConfig, ReadPolicy, Result, WriteFailure,
};

/// Terminator the device expects after every command
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// How long [Link::read_bytes] waits for data
pub const READ_BYTES_TIMEOUT: Duration = Duration::from_millis(10);

/// Consecutive empty reads after which [Link::read_bytes_exact] gives up
pub const MAX_IDLE_READS: usize = 10;

/// A request/response link to a line-oriented serial device
///
/// Commands are ASCII text framed by a trailing carriage return. Responses carry no terminator
/// or length, so a response is whatever arrives before the line goes quiet for one
/// [poll interval](ReadPolicy::poll_interval).
///
/// The link owns its device. [close](Self::close) gives it back to the OS with its original
/// settings; dropping an open link does the same.
///
/// # Usage
/// ```no_run
/// use serial_device::{Link, LinkConfig};
///
/// fn main() -> Result<(), serial_device::Error> {
///     let mut link: Link = Link::open(&LinkConfig::new("/dev/ttyS0").baud_rate(57_600u32))?;
///     println!("{}", link.send("*IDN?")?);
///     link.destroy();
///     Ok(())
/// }
/// ```
pub struct Link<T: SerialComm = TermiosPort> {
    comm: Option<T>,
    read_policy: ReadPolicy,
    last_response: String,
}

impl<T: SerialComm> Link<T> {
    /// Open and configure the device named by `config`
    ///
    /// An invalid configuration is rejected by the backend before the device is touched.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let comm = T::open(config)?;
        Ok(Self::with_comm(comm).read_policy(config.get_read_policy()))
    }

    /// Wrap an already configured backend
    pub fn with_comm(comm: T) -> Self {
        Self {
            comm: Some(comm),
            read_policy: ReadPolicy::default(),
            last_response: String::with_capacity(RESPONSE_CAPACITY),
        }
    }

    pub fn read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn is_open(&self) -> bool {
        self.comm.is_some()
    }

    /// The backend, while the link is open
    pub fn comm(&self) -> Option<&T> {
        self.comm.as_ref()
    }

    /// The normalized text of the latest successful [read](Self::read)
    ///
    /// Empty after a failed read.
    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    /// Send `command` followed by a carriage return, one byte at a time
    ///
    /// Stops at the first byte that is not written; nothing after it is sent.
    pub fn write(&mut self, command: &str) -> Result<()> {
        let comm = self.comm.as_mut().ok_or(Error::NullDevice)?;
        trace!("write: sending {:?}", command);

        for &byte in command.as_bytes().iter().chain(&[COMMAND_TERMINATOR]) {
            match comm.write_byte(byte) {
                Ok(1) => {}
                Ok(_) => {
                    return Err(Error::Write {
                        kind: WriteFailure::Other,
                        source: None,
                    })
                }
                Err(e) => return Err(Error::write(e)),
            }
        }
        Ok(())
    }

    /// Collect a response until the device goes quiet
    ///
    /// At most [RESPONSE_CAPACITY] bytes are kept; anything beyond is dropped. The result is the
    /// [normalized](crate::normalize) text, also available from
    /// [last_response](Self::last_response).
    pub fn read(&mut self) -> Result<String> {
        self.last_response.clear();
        let comm = self.comm.as_mut().ok_or(Error::NullDevice)?;

        let mut response = ResponseBuffer::new();
        let mut chunk = [0u8; RESPONSE_CAPACITY];
        let mut quiet = false;
        for _ in 0..self.read_policy.max_polls {
            if !comm
                .wait_readable(self.read_policy.poll_interval)
                .map_err(Error::SelectFailure)?
            {
                quiet = true;
                break;
            }
            let n = comm.read(&mut chunk).map_err(Error::ReadFailure)?;
            trace!("read: got {:?}", String::from_utf8_lossy(&chunk[..n]));
            response.extend(&chunk[..n]);
        }

        if !quiet {
            debug!(
                "read: device still sending after {} polls",
                self.read_policy.max_polls
            );
        }
        if response.dropped() > 0 {
            warn!(
                "read: response exceeded {} bytes, dropped {}",
                RESPONSE_CAPACITY,
                response.dropped()
            );
        }

        self.last_response = response.normalize();
        Ok(self.last_response.clone())
    }

    /// Read whatever is available, up to `n` bytes, waiting at most [READ_BYTES_TIMEOUT]
    ///
    /// The bytes are returned as received. An empty result means nothing arrived in time.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let comm = self.comm.as_mut().ok_or(Error::NullDevice)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        // one read returns only what is already buffered, which never exceeds a response
        let mut data = vec![0u8; n.min(RESPONSE_CAPACITY)];
        let len = if comm
            .wait_readable(READ_BYTES_TIMEOUT)
            .map_err(Error::SelectFailure)?
        {
            match comm.read(&mut data) {
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
                Err(e) => return Err(Error::ReadFailure(e)),
            }
        } else {
            0
        };

        data.truncate(len);
        Ok(data)
    }

    /// Read exactly `n` bytes
    ///
    /// Gives up with [Error::Stalled] after [MAX_IDLE_READS] consecutive reads return nothing.
    pub fn read_bytes_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut idle = 0;
        while data.len() < n {
            let chunk = self.read_bytes(n - data.len())?;
            if chunk.is_empty() {
                idle += 1;
                if idle >= MAX_IDLE_READS {
                    return Err(Error::Stalled {
                        wanted: n,
                        got: data.len(),
                    });
                }
            } else {
                idle = 0;
                data.extend_from_slice(&chunk);
            }
        }
        Ok(data)
    }

    /// Discard whatever the device sent that was not read yet, and anything not yet sent to it
    pub fn flush(&mut self) -> Result<()> {
        let comm = self.comm.as_mut().ok_or(Error::NullDevice)?;
        comm.purge_buffers().map_err(Error::ReadFailure)?;
        debug!("flush: discarded pending I/O");
        Ok(())
    }

    /// [write](Self::write) `message`, then [read](Self::read) the response
    ///
    /// Nothing is read if the write fails.
    pub fn send(&mut self, message: &str) -> Result<String> {
        self.write(message)?;
        self.read()
    }

    /// Restore the device's original settings and release it
    ///
    /// Does nothing on a closed link. The link itself stays usable only for
    /// [last_response](Self::last_response); every I/O call now fails with [Error::NullDevice].
    pub fn close(&mut self) {
        if let Some(comm) = self.comm.take() {
            match comm.close() {
                Ok(()) => info!("Closed serial device"),
                Err(e) => warn!("close: could not restore line settings: {}", e),
            }
        }
    }

    /// Close the link if needed and free it
    pub fn destroy(mut self) {
        self.close();
    }
}

impl<T: SerialComm> Drop for Link<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{MockComm, Step};
    use rustix::io::Errno;

    fn link(steps: impl IntoIterator<Item = Step>) -> Link<MockComm> {
        Link::with_comm(MockComm::with_steps(steps))
    }

    fn data(bytes: &[u8]) -> Step {
        Step::Data(bytes.to_vec())
    }

    #[test]
    fn write_appends_carriage_return() {
        let mut link = link([]);
        link.write("RD").unwrap();
        assert_eq!(link.comm().unwrap().written, b"RD\r");
    }

    #[test]
    fn write_failure_is_classified() {
        let mut link = link([]);
        link.comm.as_mut().unwrap().fail_write = Some((1, Errno::PIPE.raw_os_error()));

        let err = link.write("RD").unwrap_err();
        assert!(matches!(
            err,
            Error::Write {
                kind: WriteFailure::BrokenPipe,
                ..
            }
        ));
        // nothing after the failed byte
        assert_eq!(link.comm().unwrap().written, b"R");
    }

    #[test]
    fn failed_terminator_fails_the_write() {
        let mut link = link([]);
        link.comm.as_mut().unwrap().fail_write = Some((2, Errno::AGAIN.raw_os_error()));
        assert!(matches!(
            link.write("RD"),
            Err(Error::Write {
                kind: WriteFailure::WouldBlock,
                ..
            })
        ));
    }

    #[test]
    fn short_write_is_generic_failure() {
        let mut link = link([]);
        link.comm.as_mut().unwrap().short_write = Some(0);
        assert!(matches!(
            link.write("RD"),
            Err(Error::Write {
                kind: WriteFailure::Other,
                source: None
            })
        ));
        assert!(link.comm().unwrap().written.is_empty());
    }

    #[test]
    fn read_normalizes_accumulated_chunks() {
        let mut link = link([data(b"hello\n"), data(b"world  "), Step::Quiet]);
        assert_eq!(link.read().unwrap(), "hello world");
        assert_eq!(link.last_response(), "hello world");
        assert_eq!(link.comm().unwrap().reads, 2);
        assert_eq!(link.comm().unwrap().waits, 3);
    }

    #[test]
    fn quiet_device_reads_empty() {
        let mut link = link([Step::Quiet]);
        assert_eq!(link.read().unwrap(), "");
        assert_eq!(link.comm().unwrap().reads, 0);
    }

    #[test]
    fn read_does_not_keep_previous_response() {
        let mut link = link([data(b"first"), Step::Quiet, data(b"2nd"), Step::Quiet]);
        assert_eq!(link.read().unwrap(), "first");
        assert_eq!(link.read().unwrap(), "2nd");
    }

    #[test]
    fn read_stops_after_max_polls() {
        let mut link = link([]).read_policy(ReadPolicy {
            poll_interval: Duration::from_millis(1),
            max_polls: 7,
        });
        link.comm.as_mut().unwrap().chatter = Some(b"x".to_vec());

        assert_eq!(link.read().unwrap(), "xxxxxxx");
        assert_eq!(link.comm().unwrap().waits, 7);
    }

    #[test]
    fn read_truncates_long_responses() {
        let mut link = link([]);
        link.comm.as_mut().unwrap().chatter = Some(vec![b'a'; 100]);

        let response = link.read().unwrap();
        assert_eq!(response.len(), RESPONSE_CAPACITY);
        assert_eq!(link.comm().unwrap().waits, ReadPolicy::default().max_polls);
    }

    #[test]
    fn wait_error_is_select_failure() {
        let mut link = link([data(b"partial"), Step::WaitError(Errno::INTR.raw_os_error())]);
        assert!(matches!(link.read(), Err(Error::SelectFailure(_))));
        assert_eq!(link.last_response(), "");
    }

    #[test]
    fn read_error_is_read_failure() {
        let mut link = link([Step::ReadError(Errno::IO.raw_os_error())]);
        assert!(matches!(link.read(), Err(Error::ReadFailure(_))));
    }

    #[test]
    fn send_writes_once_then_reads() {
        let mut link = link([data(b"42\r\n"), Step::Quiet]);
        assert_eq!(link.send("RD").unwrap(), "42");
        let comm = link.comm().unwrap();
        assert_eq!(comm.written, b"RD\r");
        assert_eq!(comm.reads, 1);
    }

    #[test]
    fn send_skips_read_when_write_fails() {
        let mut link = link([data(b"stale"), Step::Quiet]);
        link.comm.as_mut().unwrap().fail_write = Some((0, Errno::BADF.raw_os_error()));

        assert!(matches!(
            link.send("RD"),
            Err(Error::Write {
                kind: WriteFailure::BadDescriptor,
                ..
            })
        ));
        let comm = link.comm().unwrap();
        assert_eq!(comm.waits, 0);
        assert_eq!(comm.reads, 0);
    }

    #[test]
    fn read_bytes_is_bounded() {
        let mut link = link([data(b"abcdef")]);
        assert_eq!(link.read_bytes(4).unwrap(), b"abcd");
        assert_eq!(link.read_bytes(10).unwrap(), b"ef");
        assert!(link.read_bytes(10).unwrap().is_empty());
        assert!(link.read_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn read_bytes_with_huge_limit() {
        let mut link = link([data(b"ab")]);
        assert_eq!(link.read_bytes(usize::MAX).unwrap(), b"ab");
        assert!(link.read_bytes(usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn read_bytes_exact_with_huge_count_stalls() {
        let mut link = link([data(b"ab")]);
        assert!(matches!(
            link.read_bytes_exact(usize::MAX),
            Err(Error::Stalled {
                wanted: usize::MAX,
                got: 2
            })
        ));
    }

    #[test]
    fn flush_discards_pending_input() {
        let mut link = link([data(b"stale"), Step::Quiet, data(b"fresh"), Step::Quiet]);
        link.flush().unwrap();
        assert_eq!(link.comm().unwrap().purges, 1);
        assert_eq!(link.read().unwrap(), "");
        assert_eq!(link.comm().unwrap().reads, 0);

        link.close();
        assert!(matches!(link.flush(), Err(Error::NullDevice)));
    }

    #[test]
    fn read_bytes_does_not_normalize() {
        let mut link = link([data(b" a\n")]);
        assert_eq!(link.read_bytes(8).unwrap(), b" a\n");
    }

    #[test]
    fn read_bytes_exact_gathers_chunks() {
        let mut link = link([data(b"ab"), Step::Quiet, data(b"cd"), data(b"ef")]);
        assert_eq!(link.read_bytes_exact(5).unwrap(), b"abcde");
    }

    #[test]
    fn read_bytes_exact_stalls() {
        let mut link = link([data(b"ab")]);
        assert!(matches!(
            link.read_bytes_exact(4),
            Err(Error::Stalled { wanted: 4, got: 2 })
        ));
        assert_eq!(link.comm().unwrap().waits, 1 + MAX_IDLE_READS);
    }

    #[test]
    fn closed_link_is_null_device() {
        let mut link = link([data(b"x")]);
        let closes = link.comm().unwrap().closes.clone();

        link.close();
        assert!(!link.is_open());
        assert_eq!(closes.get(), 1);

        assert!(matches!(link.write("RD"), Err(Error::NullDevice)));
        assert!(matches!(link.read(), Err(Error::NullDevice)));
        assert!(matches!(link.read_bytes(1), Err(Error::NullDevice)));
        assert!(matches!(link.flush(), Err(Error::NullDevice)));
        assert!(matches!(link.send("RD"), Err(Error::NullDevice)));

        link.close();
        link.destroy();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn destroy_and_drop_close() {
        let link = link([]);
        let closes = link.comm().unwrap().closes.clone();
        link.destroy();
        assert_eq!(closes.get(), 1);

        let link = Link::with_comm(MockComm::default());
        let closes = link.comm().unwrap().closes.clone();
        drop(link);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn open_validates_first() {
        let config = LinkConfig::new("/dev/ttyS0").data_bits(crate::DataBits::Seven);
        assert!(matches!(
            Link::<MockComm>::open(&config),
            Err(Error::InvalidConfig(_))
        ));

        let policy = ReadPolicy {
            poll_interval: Duration::from_millis(5),
            max_polls: 3,
        };
        let link = Link::<MockComm>::open(&LinkConfig::new("/dev/ttyS0").read_policy(policy))
            .unwrap();
        assert!(link.is_open());
        assert_eq!(link.read_policy, policy);
    }
}
