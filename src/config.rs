//! Line parameters and the caller-facing link configuration

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use log::debug;

use crate::error::ConfigError;

/// Baud rates a terminal line can be set to
///
/// Any other rate is mapped to [BaudRate::B0] by [BaudRate::from_rate] rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaudRate {
    /// The degenerate rate, which hangs up a modem line
    B0,
    B50,
    B75,
    B110,
    B134,
    B150,
    B200,
    B300,
    B600,
    B1200,
    B1800,
    B2400,
    B4800,
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
}

impl BaudRate {
    const ALL: [BaudRate; 19] = [
        Self::B0,
        Self::B50,
        Self::B75,
        Self::B110,
        Self::B134,
        Self::B150,
        Self::B200,
        Self::B300,
        Self::B600,
        Self::B1200,
        Self::B1800,
        Self::B2400,
        Self::B4800,
        Self::B9600,
        Self::B19200,
        Self::B38400,
        Self::B57600,
        Self::B115200,
        Self::B230400,
    ];

    /// Look up the standard rate matching `rate`, falling back to [BaudRate::B0]
    pub fn from_rate(rate: u32) -> Self {
        match Self::ALL.into_iter().find(|b| b.as_u32() == rate) {
            Some(b) => b,
            None => {
                debug!("baud rate {} is not a standard rate, using 0", rate);
                Self::B0
            }
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::B0 => 0,
            Self::B50 => 50,
            Self::B75 => 75,
            Self::B110 => 110,
            Self::B134 => 134,
            Self::B150 => 150,
            Self::B200 => 200,
            Self::B300 => 300,
            Self::B600 => 600,
            Self::B1200 => 1_200,
            Self::B1800 => 1_800,
            Self::B2400 => 2_400,
            Self::B4800 => 4_800,
            Self::B9600 => 9_600,
            Self::B19200 => 19_200,
            Self::B38400 => 38_400,
            Self::B57600 => 57_600,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
        }
    }
}

impl From<u32> for BaudRate {
    fn from(rate: u32) -> Self {
        Self::from_rate(rate)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Number of bits in each character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    pub fn count(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<u32> for DataBits {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            _ => Err(ConfigError::DataBits(bits)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl TryFrom<u32> for StopBits {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(ConfigError::StopBits(bits)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "odd" => Ok(Self::Odd),
            "even" => Ok(Self::Even),
            _ => Err(ConfigError::UnknownParity(s.to_owned())),
        }
    }
}

/// Timing of the quiescence-framed read loop
///
/// A response is considered complete once no byte arrives for `poll_interval`. The loop never
/// waits more than `max_polls` times, so a device that never goes quiet cannot hold a read
/// forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub poll_interval: Duration,
    pub max_polls: usize,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 100,
        }
    }
}

/// Everything needed to open a [Link](crate::Link)
///
/// ```
/// use serial_device::{BaudRate, DataBits, LinkConfig, Parity};
///
/// let config = LinkConfig::new("/dev/ttyUSB0")
///     .baud_rate(BaudRate::B57600)
///     .data_bits(DataBits::Seven)
///     .parity(Parity::Even);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    path: PathBuf,
    baud_rate: BaudRate,
    data_bits: DataBits,
    stop_bits: StopBits,
    parity: Parity,
    hardware_flow_control: bool,
    read_policy: ReadPolicy,
}

impl LinkConfig {
    /// A 9600 baud, 8N1 configuration without flow control
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: BaudRate::default(),
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            hardware_flow_control: false,
            read_policy: ReadPolicy::default(),
        }
    }

    /// Build a configuration from keyword options
    ///
    /// Recognized keys are `device` (required), `baud`, `parity`, `stop_bits`, `data_bits` and
    /// `hw_flow` (also spelled `hardware_flow_control`). Missing keys take their defaults.
    pub fn from_options<'a, I>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut path = None;
        let mut config = Self::new("");

        for (key, value) in options {
            let value = value.trim();
            match key.trim() {
                "device" => path = Some(PathBuf::from(value)),
                "baud" => config.baud_rate = BaudRate::from_rate(parse_number(key, value)?),
                "data_bits" => config.data_bits = DataBits::try_from(parse_number(key, value)?)?,
                "stop_bits" => config.stop_bits = StopBits::try_from(parse_number(key, value)?)?,
                "parity" => config.parity = value.parse()?,
                "hw_flow" | "hardware_flow_control" => {
                    config.hardware_flow_control =
                        value.parse().map_err(|_| invalid_value(key, value))?
                }
                _ => return Err(ConfigError::UnknownOption(key.to_owned())),
            }
        }

        config.path = path.ok_or(ConfigError::MissingDevice)?;
        config.validate()?;
        Ok(config)
    }

    pub fn baud_rate(mut self, baud_rate: impl Into<BaudRate>) -> Self {
        self.baud_rate = baud_rate.into();
        self
    }

    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Enable RTS/CTS flow control
    pub fn hardware_flow_control(mut self, enabled: bool) -> Self {
        self.hardware_flow_control = enabled;
        self
    }

    pub fn read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_baud_rate(&self) -> BaudRate {
        self.baud_rate
    }

    pub fn get_data_bits(&self) -> DataBits {
        self.data_bits
    }

    pub fn get_stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    pub fn get_parity(&self) -> Parity {
        self.parity
    }

    pub fn get_hardware_flow_control(&self) -> bool {
        self.hardware_flow_control
    }

    pub fn get_read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Check the configuration without touching the device
    ///
    /// Characters narrower than eight bits need a parity bit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingDevice);
        }
        if self.data_bits != DataBits::Eight && self.parity == Parity::None {
            return Err(ConfigError::ParityRequired(self.data_bits.count()));
        }
        Ok(())
    }
}

/// Parses a comma-separated `key=value` list, e.g. `device=/dev/ttyS0,baud=57600`
impl FromStr for LinkConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options = s
            .split(',')
            .filter(|o| !o.trim().is_empty())
            .map(|o| o.split_once('=').ok_or_else(|| invalid_value(o, "")))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_options(options)
    }
}

fn parse_number(option: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| invalid_value(option, value))
}

fn invalid_value(option: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        option: option.trim().to_owned(),
        value: value.to_owned(),
    }
}
