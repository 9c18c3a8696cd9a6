use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tracing::{debug, info, trace};

use super::cancel::CancelToken;
use super::messages::{
    LoaderMessage, MmuVersion, call_frame, checksum, decode_word, detect_dram_frame,
    flush_mmu_frame, ping_frame,
    read_block_frame, read_byte_frame, read_word_frame, write_block_header, write_byte_frame,
    write_word_frame,
};
use crate::constants::{
    BOOT_BAUD_RATE, LOADER_WINDOW_SIZE, LOADER_WRITE_CHUNK, MAX_DRAM_BANKS, RECEIVE_CHUNK,
    WRITE_BLOCK_CHUNK,
};
use crate::error::{BootError, BootResult};
use crate::interface::DeviceInterface;
use crate::interface::serialport::SerialPortDevice;
use crate::loader::check_loader_size;
use crate::util::optional_progress_bar;

/// Where the client is in the boot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    WaitingForHandshake,
    Transferring,
    WaitingForAck,
    Booted,
}

/// Single-byte signals the client waits for, discarding anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `<` from the BootROM
    ReadyForImage,
    /// `>` from the BootROM
    ImageAccepted,
    /// `!` from the loader
    Pong,
}

impl Signal {
    pub fn byte(self) -> u8 {
        match self {
            Signal::ReadyForImage => LoaderMessage::ReadyForImage.byte(),
            Signal::ImageAccepted => LoaderMessage::ImageAccepted.byte(),
            Signal::Pong => LoaderMessage::Pong.byte(),
        }
    }
}

/// DRAM map reported by the loader's detection routine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DramLayout {
    /// 16 or 32
    pub bus_width: u8,
    /// Size of each bank in bytes
    pub step: u32,
    /// Start address of every distinct physical bank
    pub banks: Vec<u32>,
}

impl DramLayout {
    pub fn total_size(&self) -> u64 {
        self.banks.len() as u64 * self.step as u64
    }
}

type Observer = Box<dyn FnMut(Signal, u8) + Send>;

/// Host side of the BootROM handshake and the SRAM loader command set.
///
/// The protocol is strictly request/response: every method takes `&mut self`
/// and does not return until the exchange is complete, so two commands can
/// never interleave on the link. By default waits block until the target
/// answers; [`BootClient::set_timeout`] and [`BootClient::cancel_token`] turn
/// a stalled target into an error instead.
pub struct BootClient {
    device: Box<dyn DeviceInterface + Send>,
    state: ClientState,
    timeout: Option<Duration>,
    cancel: CancelToken,
    observer: Option<Observer>,
    progress_bar_enable: bool,
}

impl BootClient {
    /// Open `port` at 9600 8N1 and take ownership of it
    pub fn open(port: &str) -> BootResult<Self> {
        let device = SerialPortDevice::open_boot_port(port.to_string())?;
        info!("Opened {} at {} baud", port, BOOT_BAUD_RATE);
        Ok(Self::with_device(Box::new(device)))
    }

    pub fn with_device(device: Box<dyn DeviceInterface + Send>) -> Self {
        BootClient {
            device,
            state: ClientState::Idle,
            timeout: None,
            cancel: CancelToken::new(),
            observer: None,
            progress_bar_enable: false,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// `None` waits forever. Otherwise handshake waits fail after `timeout`,
    /// and response reads fail after `timeout` without a new byte.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Token that aborts the current wait from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.progress_bar_enable = enable;
    }

    /// Called with every byte discarded while waiting for a signal
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(Signal, u8) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Wait for the BootROM's `<`, push the loader padded with zeros to the
    /// full 2048-byte SRAM window, then wait for `>`.
    pub fn enter_boot(&mut self, loader_image: &[u8]) -> BootResult<()> {
        check_loader_size(loader_image.len())?;

        self.state = ClientState::WaitingForHandshake;
        info!("Waiting for target - press Wakeup now");
        self.wait_for(Signal::ReadyForImage)?;

        self.state = ClientState::Transferring;
        let padding = LOADER_WINDOW_SIZE - loader_image.len();
        info!(
            "Writing SRAM loader ({} bytes + {} bytes padding)",
            loader_image.len(),
            padding
        );

        let mut window = Vec::with_capacity(LOADER_WINDOW_SIZE);
        window.extend_from_slice(loader_image);
        window.resize(LOADER_WINDOW_SIZE, 0);

        let pb = optional_progress_bar(
            self.progress_bar_enable,
            LOADER_WINDOW_SIZE as u64,
            "Writing loader",
        );
        for chunk in window.chunks(LOADER_WRITE_CHUNK) {
            self.device.send(chunk)?;
            pb.inc(chunk.len() as u64);
        }
        pb.finish_and_clear();

        self.state = ClientState::WaitingForAck;
        info!("Waiting for reply from BootROM");
        self.wait_for(Signal::ImageAccepted)?;

        self.state = ClientState::Booted;
        info!("Loader running");
        Ok(())
    }

    pub fn ping(&mut self) -> BootResult<()> {
        debug!("Pinging loader");
        self.command(&ping_frame())?;
        self.wait_for(Signal::Pong)?;
        debug!("Loader answered ping");
        Ok(())
    }

    pub fn read_word(&mut self, address: u32) -> BootResult<u32> {
        self.command(&read_word_frame(address))?;
        let word = self.receive_word()?;
        debug!("Read {:#010x} from {:#010x}", word, address);
        Ok(word)
    }

    /// Fire-and-forget; the loader sends nothing back.
    pub fn write_word(&mut self, address: u32, value: u32) -> BootResult<()> {
        self.command(&write_word_frame(address, value))?;
        debug!("Wrote {:#010x} to {:#010x}", value, address);
        Ok(())
    }

    /// Read exactly `length` bytes starting at `address`.
    ///
    /// The loader follows the data with a checksum byte which is left unread
    /// here; the next command's input flush drops it. Use
    /// [`BootClient::read_block_verified`] to check it instead.
    pub fn read_block(&mut self, address: u32, length: u32) -> BootResult<Vec<u8>> {
        self.command(&read_block_frame(address, length))?;
        let pb = optional_progress_bar(self.progress_bar_enable, length as u64, "Reading block");
        let data = self.receive_exact_with_progress(length as usize, &pb)?;
        pb.finish_and_clear();
        debug!("Read {} bytes from {:#010x}", data.len(), address);
        Ok(data)
    }

    /// Like [`BootClient::read_block`], but also consumes the trailing
    /// checksum byte and compares it against the received data.
    pub fn read_block_verified(&mut self, address: u32, length: u32) -> BootResult<Vec<u8>> {
        let data = self.read_block(address, length)?;
        let received = self.receive_exact(1)?[0];
        let expected = checksum(&data);
        if expected != received {
            return Err(BootError::ChecksumMismatch { expected, received });
        }
        Ok(data)
    }

    pub fn read_byte(&mut self, address: u32) -> BootResult<u8> {
        self.command(&read_byte_frame(address))?;
        let byte = self.receive_exact(1)?[0];
        debug!("Read {:#04x} from {:#010x}", byte, address);
        Ok(byte)
    }

    /// Fire-and-forget, like [`BootClient::write_word`].
    pub fn write_byte(&mut self, address: u32, value: u8) -> BootResult<()> {
        self.command(&write_byte_frame(address, value))?;
        debug!("Wrote {:#04x} to {:#010x}", value, address);
        Ok(())
    }

    /// Copy `data` to target memory in 4 KiB chunks, checking the loader's
    /// checksum after each one.
    pub fn write_block(&mut self, address: u32, data: &[u8]) -> BootResult<()> {
        let pb = optional_progress_bar(
            self.progress_bar_enable,
            data.len() as u64,
            "Writing block",
        );
        let mut chunk_address = address;

        for chunk in data.chunks(WRITE_BLOCK_CHUNK) {
            self.command(&write_block_header(chunk_address, chunk.len() as u32))?;
            self.device.send(chunk)?;

            let expected = checksum(chunk);
            let received = self.receive_exact(1)?[0];
            if expected != received {
                pb.abandon();
                return Err(BootError::ChecksumMismatch { expected, received });
            }

            chunk_address = chunk_address.wrapping_add(chunk.len() as u32);
            pb.inc(chunk.len() as u64);
        }

        pb.finish_and_clear();
        debug!("Wrote {} bytes to {:#010x}", data.len(), address);
        Ok(())
    }

    /// Jump to `address` with `args` in r0-r3. Nothing comes back unless the
    /// called code chooses to talk.
    pub fn call(&mut self, address: u32, args: [u32; 4]) -> BootResult<()> {
        self.command(&call_frame(address, args))?;
        info!("Called {:#010x} with {:#010x?}", address, args);
        Ok(())
    }

    /// Have the loader flush caches and TLBs. Fire-and-forget; boards need
    /// this before their registers are touched.
    pub fn flush_mmu(&mut self, version: MmuVersion) -> BootResult<()> {
        self.command(&flush_mmu_frame(version))?;
        debug!("Flushed {:?} MMU", version);
        Ok(())
    }

    /// Run the loader's destructive DRAM probe
    pub fn detect_dram(&mut self) -> BootResult<DramLayout> {
        self.command(&detect_dram_frame())?;

        let bus_width = self.receive_exact(1)?[0];
        if bus_width == LoaderMessage::UnknownCommand.byte() {
            return Err(BootError::UnexpectedResponse(
                "Loader does not support DRAM detection".to_string(),
            ));
        }
        if bus_width != 16 && bus_width != 32 {
            return Err(BootError::UnexpectedResponse(format!(
                "Invalid DRAM bus width {}",
                bus_width
            )));
        }

        let step = self.receive_word()?;
        let mut banks = Vec::new();
        loop {
            let bank = self.receive_word()?;
            if bank == 0 {
                break;
            }
            if banks.len() == MAX_DRAM_BANKS {
                return Err(BootError::UnexpectedResponse(
                    "DRAM bank list is not terminated".to_string(),
                ));
            }
            banks.push(bank);
        }

        info!(
            "Detected {}-bit DRAM, {} banks of {:#x} bytes",
            bus_width,
            banks.len(),
            step
        );
        Ok(DramLayout {
            bus_width,
            step,
            banks,
        })
    }

    fn command(&mut self, frame: &[u8]) -> BootResult<()> {
        self.device.discard_input()?;
        self.device.send(frame)
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    fn check_cancelled(&self) -> BootResult<()> {
        if self.cancel.take() {
            info!("Wait cancelled");
            return Err(BootError::Cancelled);
        }
        Ok(())
    }

    /// Read one byte at a time until `signal` shows up
    fn wait_for(&mut self, signal: Signal) -> BootResult<()> {
        let deadline = self.deadline();
        let expected = signal.byte();
        let mut byte = [0u8; 1];

        loop {
            self.check_cancelled()?;
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(BootError::HandshakeTimeout {
                    expected: expected as char,
                });
            }

            if self.device.receive(&mut byte)? == 0 {
                continue;
            }

            if byte[0] == expected {
                trace!("Got {:?}", signal);
                return Ok(());
            }

            debug!(
                "Other character got while waiting for {:?}: {:#04x}",
                signal, byte[0]
            );
            if let Some(observer) = self.observer.as_mut() {
                observer(signal, byte[0]);
            }
        }
    }

    fn receive_word(&mut self) -> BootResult<u32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.receive_exact(4)?);
        Ok(decode_word(word))
    }

    fn receive_exact(&mut self, expected: usize) -> BootResult<Vec<u8>> {
        self.receive_exact_with_progress(expected, &ProgressBar::hidden())
    }

    fn receive_exact_with_progress(
        &mut self,
        expected: usize,
        pb: &ProgressBar,
    ) -> BootResult<Vec<u8>> {
        // Grows with the data; `expected` comes straight from the caller
        let mut buffer = Vec::with_capacity(expected.min(RECEIVE_CHUNK));
        let mut chunk = [0u8; RECEIVE_CHUNK];
        let mut deadline = self.deadline();

        while buffer.len() < expected {
            self.check_cancelled()?;

            let wanted = (expected - buffer.len()).min(RECEIVE_CHUNK);
            let size = self.device.receive(&mut chunk[..wanted])?;
            if size == 0 {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(BootError::ShortResponse {
                        expected,
                        received: buffer.len(),
                    });
                }
                continue;
            }

            buffer.extend_from_slice(&chunk[..size]);
            pb.inc(size as u64);
            deadline = self.deadline();
        }

        Ok(buffer)
    }
}
