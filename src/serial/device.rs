//! Serial device access
//!
//! [`SerialDevice`] is the narrow surface the session's read loop needs;
//! [`PortOpener`] turns a device path into one. The system implementation
//! wraps the `serialport` crate; tests substitute an in-memory device.

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::errors::SerialError;
use crate::models::PortInfo;

/// An open serial handle
pub trait SerialDevice: Send {
    /// Read bytes that are already pending. `Ok(0)` means nothing is available.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes and flush
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn set_baud_rate(&mut self, rate: u32) -> io::Result<()>;

    fn baud_rate(&self) -> u32;
}

/// Opens serial devices by OS path
pub trait PortOpener: Send + Sync {
    fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, SerialError>;
}

/// Hardware serial port backed by `serialport`
pub struct SystemSerialDevice {
    port: Box<dyn serialport::SerialPort>,
    baud_rate: u32,
}

impl SerialDevice for SystemSerialDevice {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if pending == 0 {
            return Ok(0);
        }

        let len = pending.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, bytes)?;
        self.port.flush()
    }

    fn set_baud_rate(&mut self, rate: u32) -> io::Result<()> {
        self.port.set_baud_rate(rate).map_err(io::Error::from)?;
        self.baud_rate = rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

/// Opens real serial ports
#[derive(Debug, Clone)]
pub struct SystemPortOpener {
    read_timeout: Duration,
}

impl SystemPortOpener {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl PortOpener for SystemPortOpener {
    fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, SerialError> {
        let port = serialport::new(path, baud_rate)
            .timeout(self.read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open()
            .map_err(|e| SerialError::PortUnavailable {
                port: path.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Box::new(SystemSerialDevice { port, baud_rate }))
    }
}

/// Enumerate serial ports known to the OS
pub fn list_ports() -> Result<Vec<PortInfo>, SerialError> {
    let ports = serialport::available_ports().map_err(|e| SerialError::PortUnavailable {
        port: "*".to_string(),
        reason: e.to_string(),
    })?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let name = std::path::Path::new(&port.port_name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| port.port_name.clone());

            let (description, hwid) = match &port.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    info.product.clone().unwrap_or_else(|| "USB Serial".to_string()),
                    format!(
                        "USB VID:PID={:04X}:{:04X}{}",
                        info.vid,
                        info.pid,
                        info.serial_number
                            .as_ref()
                            .map(|s| format!(" SER={}", s))
                            .unwrap_or_default()
                    ),
                ),
                serialport::SerialPortType::PciPort => ("PCI Serial".to_string(), "PCI".to_string()),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth Serial".to_string(), "BLUETOOTH".to_string())
                }
                _ => ("n/a".to_string(), "n/a".to_string()),
            };

            PortInfo {
                device: port.port_name,
                name,
                description,
                hwid,
            }
        })
        .collect())
}
