use serialport::ClearBuffer;
use tracing::trace;

use super::DeviceInterface;
use crate::constants::{BOOT_BAUD_RATE, SERIAL_TIMEOUT_MS};

use crate::error::{BootError, BootResult};
use std::io::{Read, Write};

pub type ComPort = String;
pub type BaudRate = u32;

/// Serial port device_interface layer
pub struct SerialPortDevice {
    serial_port: Box<dyn serialport::SerialPort>,
}

impl SerialPortDevice {
    pub fn new(port: ComPort, baud: BaudRate) -> BootResult<SerialPortDevice> {
        let serial_port = serialport::new(&port, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()
            .map_err(|e| BootError::Communication(format!("Failed to open {}: {}", port, e)))?;

        Ok(SerialPortDevice { serial_port })
    }

    /// Open `port` at the BootROM's fixed rate
    pub fn open_boot_port(port: ComPort) -> BootResult<SerialPortDevice> {
        Self::new(port, BOOT_BAUD_RATE)
    }
}

impl DeviceInterface for SerialPortDevice {
    fn send(&mut self, bytes: &[u8]) -> BootResult<()> {
        self.serial_port
            .write_all(bytes)
            .map_err(|e| BootError::Communication(format!("{:?}", e)))?;
        self.serial_port
            .flush()
            .map_err(|e| BootError::Communication(format!("{:?}", e)))?;
        trace!("Sent bytes {:02x?}", bytes);
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> BootResult<usize> {
        let size = self
            .serial_port
            .read(buffer)
            // Timeout error is fine, just continue
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    Ok(0)
                } else {
                    Err(e)
                }
            })
            .map_err(|e| BootError::Communication(format!("{:?}", e)))?;

        if size > 0 {
            trace!("Received bytes {:02x?}", &buffer[..size]);
        }
        Ok(size)
    }

    fn discard_input(&mut self) -> BootResult<()> {
        self.serial_port
            .clear(ClearBuffer::Input)
            .map_err(|e| {
                BootError::Communication(format!("Failed to discard receive buffer, {}", e))
            })?;

        Ok(())
    }
}
