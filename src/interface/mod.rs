pub mod serialport;

use crate::error::BootResult;

/// Byte-level link to the target. `BootClient` owns exactly one of these
/// for its whole lifetime; dropping it releases the underlying device.
pub trait DeviceInterface {
    /// Write every byte of `bytes` to the target
    fn send(&mut self, bytes: &[u8]) -> BootResult<()>;

    /// Read whatever has arrived, up to `buffer.len()` bytes.
    /// `Ok(0)` means nothing arrived within one poll interval.
    fn receive(&mut self, buffer: &mut [u8]) -> BootResult<usize>;

    /// Drop any bytes received but not yet read
    fn discard_input(&mut self) -> BootResult<()>;
}
