use std::{fmt, io, path::PathBuf};

use rustix::io::Errno;

pub type Result<T> = std::result::Result<T, Error>;

/// An error talking to a serial device
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The link has been closed, or was never opened
    #[error("serial device is not open")]
    NullDevice,

    /// Opening the device node or applying its line settings failed
    #[error("device `{}` is unavailable: {source}", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting for the device to become readable failed
    #[error("waiting for device response failed: {0}")]
    SelectFailure(#[source] io::Error),

    /// The read call itself failed
    #[error("error reading data from device: {0}")]
    ReadFailure(#[source] io::Error),

    /// Some byte of a framed command could not be written
    #[error("error writing: {kind}")]
    Write {
        kind: WriteFailure,
        #[source]
        source: Option<io::Error>,
    },

    /// The link configuration was rejected before touching the device
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The device stopped producing data before the requested byte count arrived
    #[error("device stalled after {got} of {wanted} bytes")]
    Stalled { wanted: usize, got: usize },

    /// A command argument failed its validation check, so nothing was sent
    #[error("value `{value}` rejected for command `{command}`")]
    Rejected { command: &'static str, value: String },
}

impl Error {
    pub(crate) fn write(source: io::Error) -> Self {
        Error::Write {
            kind: WriteFailure::from_io_error(&source),
            source: Some(source),
        }
    }
}

/// Classification of a failed write, derived from the OS error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    WouldBlock,
    BadDescriptor,
    BadAddress,
    FileTooLarge,
    Interrupted,
    InvalidForWriting,
    IoError,
    OutOfSpace,
    BrokenPipe,
    /// A short write, or an OS code with no dedicated variant
    Other,
}

impl WriteFailure {
    pub fn from_errno(errno: Errno) -> Self {
        match errno {
            Errno::AGAIN => Self::WouldBlock,
            Errno::BADF => Self::BadDescriptor,
            Errno::FAULT => Self::BadAddress,
            Errno::FBIG => Self::FileTooLarge,
            Errno::INTR => Self::Interrupted,
            Errno::INVAL => Self::InvalidForWriting,
            Errno::IO => Self::IoError,
            Errno::NOSPC => Self::OutOfSpace,
            Errno::PIPE => Self::BrokenPipe,
            _ => Self::Other,
        }
    }

    pub fn from_io_error(e: &io::Error) -> Self {
        Errno::from_io_error(e).map_or(Self::Other, Self::from_errno)
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WouldBlock => "non-blocking device will block",
            Self::BadDescriptor => "invalid file descriptor",
            Self::BadAddress => "buffer not addressable",
            Self::FileTooLarge => "file size exceeded",
            Self::Interrupted => "call interrupted",
            Self::InvalidForWriting => "unsuitable for writing",
            Self::IoError => "low-level I/O error",
            Self::OutOfSpace => "no room for data",
            Self::BrokenPipe => "receiving end cannot read",
            Self::Other => "error writing data to device",
        })
    }
}

/// A rejected link configuration
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("device must be specified")]
    MissingDevice,

    #[error("data bits must be between 5 and 8, got {0}")]
    DataBits(u32),

    #[error("stop bits must be either 1 or 2, got {0}")]
    StopBits(u32),

    /// Fewer than eight data bits are only usable with a parity bit
    #[error("parity must be odd or even with {0} data bits")]
    ParityRequired(u8),

    #[error("parity must be odd, even, or none, got `{0}`")]
    UnknownParity(String),

    #[error("unrecognized option `{0}`")]
    UnknownOption(String),

    #[error("invalid value `{value}` for option `{option}`")]
    InvalidValue { option: String, value: String },
}
