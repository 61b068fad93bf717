use super::serial_comm::SerialComm;
use crate::{DataBits, Error, LinkConfig, Parity, Result, StopBits};
use log::info;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use std::thread;

/// Granularity of [wait_readable](SerialComm::wait_readable), which has to poll the port
const POLL_STEP: Duration = Duration::from_millis(1);

/// Read timeout handed to the serialport library; readiness is checked before every read
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Framing for the serialport library, derived from a [LinkConfig]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PortSettings {
    baud_rate: u32,
    data_bits: serialport::DataBits,
    stop_bits: serialport::StopBits,
    parity: serialport::Parity,
    flow_control: serialport::FlowControl,
}

impl PortSettings {
    fn from_config(config: &LinkConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            baud_rate: config.get_baud_rate().as_u32(),
            data_bits: match config.get_data_bits() {
                DataBits::Five => serialport::DataBits::Five,
                DataBits::Six => serialport::DataBits::Six,
                DataBits::Seven => serialport::DataBits::Seven,
                DataBits::Eight => serialport::DataBits::Eight,
            },
            stop_bits: match config.get_stop_bits() {
                StopBits::One => serialport::StopBits::One,
                StopBits::Two => serialport::StopBits::Two,
            },
            parity: match config.get_parity() {
                Parity::None => serialport::Parity::None,
                Parity::Odd => serialport::Parity::Odd,
                Parity::Even => serialport::Parity::Even,
            },
            flow_control: if config.get_hardware_flow_control() {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            },
        })
    }

    fn builder(&self, path: &str) -> serialport::SerialPortBuilder {
        serialport::new(path, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(self.data_bits)
            .stop_bits(self.stop_bits)
            .parity(self.parity)
            .flow_control(self.flow_control)
    }
}

/// Communicate with a serial device using the
/// serialport library
///
/// /dev/tty* or similar on unix-like systems
/// COM devices on Windows systems
///
/// The serialport library does not hand back the settings it replaced, so closing this port
/// only discards pending I/O and leaves the line as the link configured it.
pub struct SerialPort {
    device: Box<dyn serialport::SerialPort>,
}

impl SerialComm for SerialPort {
    fn open(config: &LinkConfig) -> Result<Self> {
        let settings = PortSettings::from_config(config)?;
        let unavailable = |source: io::Error| Error::DeviceUnavailable {
            path: config.path().to_owned(),
            source,
        };

        let path = config.path().to_string_lossy();
        let device = settings
            .builder(&path)
            .open()
            .map_err(|e| unavailable(e.into()))?;

        let mut port = Self { device };
        port.purge_buffers().map_err(unavailable)?;
        info!("Opened {} through serialport", path);
        Ok(port)
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<usize> {
        self.device.write(&[byte])
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let start = Instant::now();
        loop {
            if self.device.bytes_to_read()? > 0 {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            thread::sleep(POLL_STEP);
        }
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        match self.device.read(data) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            r => r,
        }
    }

    fn purge_buffers(&mut self) -> io::Result<()> {
        Ok(self.device.clear(serialport::ClearBuffer::All)?)
    }

    fn close(mut self) -> io::Result<()> {
        self.purge_buffers()
    }
}
