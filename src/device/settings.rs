use std::io;

use rustix::termios::{ControlModes, InputModes, OutputModes, SpecialCodeIndex, Termios};

use crate::{BaudRate, DataBits, LinkConfig, Parity, Result, StopBits};

/// Raw-mode terminal settings derived from a [LinkConfig]
///
/// Building these never touches a device. Reads are configured to return whatever is available
/// immediately (`VMIN` and `VTIME` are zero); response timing is left to the link's own poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: BaudRate,
    pub control_modes: ControlModes,
    pub input_modes: InputModes,
    pub output_modes: OutputModes,
    pub min_chars: u8,
    pub read_timeout: u8,
}

impl LineSettings {
    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        config.validate()?;

        let mut control_modes = ControlModes::CREAD | ControlModes::CLOCAL;
        control_modes |= match config.get_data_bits() {
            DataBits::Five => ControlModes::CS5,
            DataBits::Six => ControlModes::CS6,
            DataBits::Seven => ControlModes::CS7,
            DataBits::Eight => ControlModes::CS8,
        };
        if config.get_stop_bits() == StopBits::Two {
            control_modes |= ControlModes::CSTOPB;
        }
        control_modes |= match config.get_parity() {
            Parity::None => ControlModes::empty(),
            Parity::Even => ControlModes::PARENB,
            Parity::Odd => ControlModes::PARENB | ControlModes::PARODD,
        };
        if config.get_hardware_flow_control() {
            control_modes |= ControlModes::CRTSCTS;
        }

        Ok(Self {
            baud_rate: config.get_baud_rate(),
            control_modes,
            // bytes with parity errors are dropped, not marked
            input_modes: InputModes::IGNPAR,
            output_modes: OutputModes::empty(),
            min_chars: 0,
            read_timeout: 0,
        })
    }

    /// Overwrite `termios` with these settings
    pub fn apply(&self, termios: &mut Termios) -> io::Result<()> {
        termios.make_raw();
        termios.control_modes = self.control_modes;
        termios.input_modes = self.input_modes;
        termios.output_modes = self.output_modes;
        termios.special_codes[SpecialCodeIndex::VMIN] = self.min_chars;
        termios.special_codes[SpecialCodeIndex::VTIME] = self.read_timeout;
        // after the control modes, which carry the speed bits on some platforms
        self.apply_speed(termios)
    }

    pub fn apply_speed(&self, termios: &mut Termios) -> io::Result<()> {
        Ok(termios.set_speed(self.baud_rate.as_u32())?)
    }
}
