//! Command and response bytes understood by the BootROM and the SRAM loader,
//! plus the fixed frame layouts built from them. Every 32-bit field goes out
//! least significant byte first, which is how the loader assembles words.

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderMessage {
    // BootROM handshake
    ReadyForImage = b'<',
    ImageAccepted = b'>',

    // Loader commands
    Ping = b'a',
    ReadWord = b'r',
    WriteWord = b'w',
    ReadBlock = b'R',
    WriteBlock = b'W',
    ReadByte = b'g',
    WriteByte = b's',
    Call = b'c',
    DetectDram = b'd',
    FlushV3 = b'3',
    FlushV4 = b'4',

    // Loader responses
    Pong = b'!',
    UnknownCommand = b'?',
}

impl LoaderMessage {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// ARM core generation whose cache/TLB flush sequence the loader runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MmuVersion {
    /// ARM710-style v3 MMU
    V3,
    /// ARM720T-style v4 MMU
    V4,
}

pub fn encode_word(word: u32) -> [u8; 4] {
    word.to_le_bytes()
}

pub fn decode_word(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

fn frame(command: LoaderMessage, words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 * words.len());
    out.push(command.byte());
    for word in words {
        out.extend_from_slice(&encode_word(*word));
    }
    out
}

pub fn ping_frame() -> Vec<u8> {
    vec![LoaderMessage::Ping.byte()]
}

pub fn read_word_frame(address: u32) -> Vec<u8> {
    frame(LoaderMessage::ReadWord, &[address])
}

pub fn write_word_frame(address: u32, value: u32) -> Vec<u8> {
    frame(LoaderMessage::WriteWord, &[address, value])
}

pub fn read_block_frame(address: u32, length: u32) -> Vec<u8> {
    frame(LoaderMessage::ReadBlock, &[address, length])
}

/// Header only; the data bytes follow on the wire
pub fn write_block_header(address: u32, length: u32) -> Vec<u8> {
    frame(LoaderMessage::WriteBlock, &[address, length])
}

pub fn read_byte_frame(address: u32) -> Vec<u8> {
    frame(LoaderMessage::ReadByte, &[address])
}

pub fn write_byte_frame(address: u32, value: u8) -> Vec<u8> {
    let mut out = frame(LoaderMessage::WriteByte, &[address]);
    out.push(value);
    out
}

pub fn call_frame(address: u32, args: [u32; 4]) -> Vec<u8> {
    frame(
        LoaderMessage::Call,
        &[address, args[0], args[1], args[2], args[3]],
    )
}

pub fn flush_mmu_frame(version: MmuVersion) -> Vec<u8> {
    let command = match version {
        MmuVersion::V3 => LoaderMessage::FlushV3,
        MmuVersion::V4 => LoaderMessage::FlushV4,
    };
    vec![command.byte()]
}

pub fn detect_dram_frame() -> Vec<u8> {
    vec![LoaderMessage::DetectDram.byte()]
}

/// Wrapping byte sum the loader reports after block transfers
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}
