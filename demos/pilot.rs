//! Query a laser controller over a serial line
//!
//! ```text
//! cargo run --example pilot -- device=/dev/ttyUSB0,baud=57600 [current]
//! ```

use serial_device::{device_commands, Link, LinkConfig};

device_commands! {
    /// Commands understood by the pilot laser controller
    trait Pilot;

    fn identity() = "*idn?";
    fn laser_current() = ":Laser:Current?";
    fn laser_status() = ":Laser:Status?";
    fn laser_temperature() = ":TEC:Temperature?";
    fn piezo_offset() = ":Piezo:Offset?";
    /// Set the piezo offset in volts
    fn set_piezo_offset(volts: f32) = ":Piezo:Offset {}",
        check |v: &f32| (-13.5..=13.5).contains(v);
    /// Set the diode current in amps; the controller biases it negative
    fn set_laser_current(amps: f32) = ":Laser:Current {:.3}",
        check |a: &f32| *a < 0.0 && *a > -3.0;
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config: LinkConfig = args
        .next()
        .as_deref()
        .unwrap_or("device=/dev/ttyS0,baud=57600")
        .parse()?;
    let mut device: Link = Link::open(&config)?;

    println!("Identity: {}", device.identity()?);
    println!("Status: {}", device.laser_status()?);
    println!("Temperature: {}", device.laser_temperature()?);
    println!("Piezo offset: {}", device.piezo_offset()?);

    if let Some(current) = args.next() {
        let current: f32 = current.parse()?;
        println!("Set current: {:?}", device.set_laser_current(current));
    }
    println!("Current: {}", device.laser_current()?);

    device.destroy();
    Ok(())
}
