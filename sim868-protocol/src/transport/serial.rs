use std::io;
use std::time::Duration;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use log::{debug, info, warn};

use crate::error::{ModemError, Result};

use super::SerialChannel;

/// Default serial port settings.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
const PARITY: serialport::Parity = serialport::Parity::None;

/// Blocking read timeout. Reads only happen after `bytes_to_read()` reported
/// data, so this is a backstop.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// A `SerialChannel` backed by a native serial port.
pub struct SerialPortChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPortChannel {
    pub fn new(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { port }
    }

    /// Name of the underlying port, if the platform reports one.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    /// A power signal driving this port's DTR line.
    pub fn dtr_power_signal(&self) -> Result<DtrPowerSignal> {
        let port = self.port.try_clone().map_err(ModemError::Serial)?;
        Ok(DtrPowerSignal { port })
    }
}

impl SerialChannel for SerialPortChannel {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, bytes)?;
        io::Write::flush(&mut self.port)
    }

    fn has_data_available(&mut self) -> io::Result<bool> {
        self.port
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        io::Read::read_exact(&mut self.port, &mut byte)?;
        Ok(byte[0])
    }
}

/// Open a serial port with 8N1 settings at the given baud rate.
pub fn open_port(port_name: &str, baud_rate: u32) -> Result<SerialPortChannel> {
    let port = serialport::new(port_name, baud_rate)
        .data_bits(DATA_BITS)
        .stop_bits(STOP_BITS)
        .parity(PARITY)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => ModemError::PortNotFound(port_name.to_string()),
            _ => ModemError::Serial(e),
        })?;

    info!("opened {} at {} baud", port_name, baud_rate);
    let mut channel = SerialPortChannel::new(port);

    // Drop anything the modem printed before we were listening.
    if let Err(e) = channel.port.clear(serialport::ClearBuffer::All) {
        warn!("failed to clear buffers on {}: {}", port_name, e);
    }
    // Keep the power line released until a power cycle asks for it.
    channel.port.write_data_terminal_ready(false).map_err(ModemError::Serial)?;

    Ok(channel)
}

/// Names of the serial ports present on this host.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(ModemError::Serial)?;
    for port in &ports {
        debug!("found port: {} ({:?})", port.port_name, port.port_type);
    }
    if ports.is_empty() {
        warn!("no serial ports found");
    }
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// An `OutputPin` that drives the DTR line of a serial port.
///
/// USB-serial adapters commonly expose DTR on a header pin; wired through a
/// transistor to the modem's PWRKEY it gives the host a power-cycle line.
pub struct DtrPowerSignal {
    port: Box<dyn serialport::SerialPort>,
}

/// Error raised when the DTR line cannot be driven.
#[derive(Debug)]
pub struct DtrError(pub serialport::Error);

impl embedded_hal::digital::Error for DtrError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for DtrPowerSignal {
    type Error = DtrError;
}

impl OutputPin for DtrPowerSignal {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        self.port.write_data_terminal_ready(false).map_err(DtrError)
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        self.port.write_data_terminal_ready(true).map_err(DtrError)
    }
}
