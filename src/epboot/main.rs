use clap::Parser;
use commands::{
    BlockReadOptions, BlockWriteOptions, BootOptions, CallOptions, ConnectionOptions,
    FlushMmuOptions, WordReadOptions, WordWriteOptions, handle_boot, handle_call,
    handle_detect_dram, handle_flush_mmu, handle_ping, handle_read_block, handle_read_word,
    handle_write_block, handle_write_word,
};
use epboot::error::BootResult;

mod commands;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
enum Cli {
    /// Wait for the BootROM, push the SRAM loader, then ping it
    #[command(name = "boot", alias = "b")]
    Boot(BootOptions),

    /// Check that the loader is alive
    #[command(name = "ping")]
    Ping(ConnectionOptions),

    /// Read one 32-bit word
    #[command(name = "read-word", alias = "peek")]
    ReadWord(WordReadOptions),

    /// Write one 32-bit word (no acknowledgement)
    #[command(name = "write-word", alias = "poke")]
    WriteWord(WordWriteOptions),

    /// Read a block of memory to a file or stdout
    #[command(name = "read-block", alias = "dump")]
    ReadBlock(BlockReadOptions),

    /// Write a file into target memory
    #[command(name = "write-block", alias = "load")]
    WriteBlock(BlockWriteOptions),

    /// Probe DRAM width and banks (destroys DRAM contents)
    #[command(name = "detect-dram")]
    DetectDram(ConnectionOptions),

    /// Flush the target's caches and TLBs
    #[command(name = "flush-mmu")]
    FlushMmu(FlushMmuOptions),

    /// Jump to an address with up to four register arguments
    #[command(name = "call")]
    Call(CallOptions),
}

impl Cli {
    fn connection(&self) -> &ConnectionOptions {
        match self {
            Cli::Boot(opts) => &opts.connection,
            Cli::Ping(opts) | Cli::DetectDram(opts) => opts,
            Cli::ReadWord(opts) => &opts.connection,
            Cli::WriteWord(opts) => &opts.connection,
            Cli::ReadBlock(opts) => &opts.connection,
            Cli::WriteBlock(opts) => &opts.connection,
            Cli::FlushMmu(opts) => &opts.connection,
            Cli::Call(opts) => &opts.connection,
        }
    }
}

fn main() -> BootResult<()> {
    let cli = Cli::parse();

    let level = if cli.connection().verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli {
        Cli::Boot(opts) => handle_boot(opts)?,
        Cli::Ping(opts) => handle_ping(opts)?,
        Cli::ReadWord(opts) => handle_read_word(opts)?,
        Cli::WriteWord(opts) => handle_write_word(opts)?,
        Cli::ReadBlock(opts) => handle_read_block(opts)?,
        Cli::WriteBlock(opts) => handle_write_block(opts)?,
        Cli::DetectDram(opts) => handle_detect_dram(opts)?,
        Cli::FlushMmu(opts) => handle_flush_mmu(opts)?,
        Cli::Call(opts) => handle_call(opts)?,
    }

    Ok(())
}
