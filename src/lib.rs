//! Host-side client for the CL-PS7111/EP7211 serial bootstrap.
//!
//! In boot mode the chip's BootROM emits `<`, reads exactly 2048 bytes into
//! internal SRAM, answers `>` and jumps to them. The code pushed there is a
//! small loader that then serves memory access commands over the same 9600
//! baud link. [`BootClient`] drives both halves:
//!
//! ```no_run
//! use epboot::{BootClient, LoaderImage};
//!
//! let loader = LoaderImage::from_file("loader.bin")?;
//! let mut client = BootClient::open("/dev/ttyUSB0")?;
//! client.enter_boot(loader.as_bytes())?;
//! client.ping()?;
//! let value = client.read_word(0x8000_2300)?;
//! client.write_word(0x8000_2300, value | 0x422)?;
//! # Ok::<(), epboot::error::BootError>(())
//! ```

pub mod constants;
pub mod error;
pub mod interface;
pub mod loader;
pub mod protocols;
pub(crate) mod util;

pub use loader::LoaderImage;
pub use protocols::cancel::CancelToken;
pub use protocols::client::{BootClient, ClientState, DramLayout, Signal};
pub use protocols::messages::MmuVersion;
