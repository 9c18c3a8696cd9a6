/// The BootROM only talks 9600 8N1.
pub const BOOT_BAUD_RATE: u32 = 9600;

/// Internal SRAM the BootROM fills from the serial line; the loader transfer
/// is always exactly this long.
pub const LOADER_WINDOW_SIZE: usize = 0x800;

/// Top of SRAM used by the loader's stack.
pub(crate) const LOADER_STACK_RESERVE: usize = 0x100;

pub(crate) const SERIAL_TIMEOUT_MS: u64 = 50;
pub(crate) const LOADER_WRITE_CHUNK: usize = 64;
pub(crate) const RECEIVE_CHUNK: usize = 0x1000;
pub(crate) const WRITE_BLOCK_CHUNK: usize = 0x1000;
pub(crate) const MAX_DRAM_BANKS: usize = 2048;

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
