use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use epboot::{
    BootClient, LoaderImage, MmuVersion,
    constants::DEFAULT_SERIAL_PORT,
    error::{BootError, BootResult},
};
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub(crate) struct ConnectionOptions {
    /// Serial port
    #[clap(short, long, default_value = DEFAULT_SERIAL_PORT)]
    pub port: String,

    /// Give up waiting for the target after this many seconds
    #[clap(short, long)]
    pub timeout: Option<f64>,

    /// Log every discarded byte
    #[clap(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BootOptions {
    /// Raw SRAM loader binary (at most 2048 bytes)
    #[clap(short, long, default_value = "loader.bin")]
    loader: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct WordReadOptions {
    #[clap(value_parser = parse_number)]
    address: u32,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct WordWriteOptions {
    #[clap(value_parser = parse_number)]
    address: u32,

    #[clap(value_parser = parse_number)]
    value: u32,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BlockReadOptions {
    #[clap(value_parser = parse_number)]
    address: u32,

    #[clap(value_parser = parse_number)]
    length: u32,

    /// Write the block here instead of hex dumping it
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Also check the loader's trailing checksum
    #[clap(long, default_value_t = false)]
    verify: bool,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BlockWriteOptions {
    #[clap(value_parser = parse_number)]
    address: u32,

    file: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FlushMmuOptions {
    /// MMU generation of the target core
    #[clap(short, long, value_enum, default_value_t = MmuVersion::V4)]
    mmu: MmuVersion,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CallOptions {
    #[clap(value_parser = parse_number)]
    address: u32,

    /// Values for r0-r3; missing ones are zero
    #[clap(value_parser = parse_number, num_args = 0..=4)]
    args: Vec<u32>,

    #[command(flatten)]
    pub connection: ConnectionOptions,
}

/// Decimal or 0x-prefixed hex
fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

fn connect(opts: &ConnectionOptions) -> BootResult<BootClient> {
    let mut client = BootClient::open(&opts.port)?;
    client.set_timeout(opts.timeout.map(Duration::from_secs_f64));
    client.progress_bar(true);

    let token = client.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    Ok(client)
}

pub(crate) fn handle_boot(opts: BootOptions) -> BootResult<()> {
    let loader = LoaderImage::from_file(&opts.loader)?;
    let mut client = connect(&opts.connection)?;

    client.enter_boot(loader.as_bytes())?;
    client.ping()?;
    info!("Target booted, loader answering");
    Ok(())
}

pub(crate) fn handle_ping(opts: ConnectionOptions) -> BootResult<()> {
    let mut client = connect(&opts)?;
    client.ping()?;
    println!("pong");
    Ok(())
}

pub(crate) fn handle_read_word(opts: WordReadOptions) -> BootResult<()> {
    let mut client = connect(&opts.connection)?;
    let value = client.read_word(opts.address)?;
    println!("{:#010x}: {:#010x}", opts.address, value);
    Ok(())
}

pub(crate) fn handle_write_word(opts: WordWriteOptions) -> BootResult<()> {
    let mut client = connect(&opts.connection)?;
    client.write_word(opts.address, opts.value)
}

pub(crate) fn handle_read_block(opts: BlockReadOptions) -> BootResult<()> {
    let mut client = connect(&opts.connection)?;
    let data = if opts.verify {
        client.read_block_verified(opts.address, opts.length)?
    } else {
        client.read_block(opts.address, opts.length)?
    };

    match opts.output {
        Some(path) => {
            std::fs::write(&path, &data).map_err(|e| {
                BootError::Communication(format!("Failed to write {}: {}", path.display(), e))
            })?;
            info!("Saved {} bytes to {}", data.len(), path.display());
        }
        None => print!("{}", hex_dump(opts.address, &data)),
    }
    Ok(())
}

pub(crate) fn handle_write_block(opts: BlockWriteOptions) -> BootResult<()> {
    let data = std::fs::read(&opts.file).map_err(|e| {
        BootError::LoaderError(format!("Failed to read {}: {}", opts.file.display(), e))
    })?;
    let mut client = connect(&opts.connection)?;
    client.write_block(opts.address, &data)?;
    info!("Wrote {} bytes at {:#010x}", data.len(), opts.address);
    Ok(())
}

pub(crate) fn handle_detect_dram(opts: ConnectionOptions) -> BootResult<()> {
    let mut client = connect(&opts)?;
    let layout = client.detect_dram()?;

    println!("bus width: {} bits", layout.bus_width);
    for bank in &layout.banks {
        println!("- start: {:#010x} size: {:#010x}", bank, layout.step);
    }
    println!("total: {} KiB", layout.total_size() / 1024);
    Ok(())
}

pub(crate) fn handle_flush_mmu(opts: FlushMmuOptions) -> BootResult<()> {
    let mut client = connect(&opts.connection)?;
    client.flush_mmu(opts.mmu)
}

pub(crate) fn handle_call(opts: CallOptions) -> BootResult<()> {
    let mut args = [0u32; 4];
    for (slot, value) in args.iter_mut().zip(&opts.args) {
        *slot = *value;
    }
    let mut client = connect(&opts.connection)?;
    client.call(opts.address, args)
}

fn hex_dump(base: u32, data: &[u8]) -> String {
    let mut out = String::new();
    for (row, line) in data.chunks(16).enumerate() {
        let address = base.wrapping_add((row * 16) as u32);
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}: {:<47}  |{}|\n", address, hex.join(" "), ascii));
    }
    out
}
