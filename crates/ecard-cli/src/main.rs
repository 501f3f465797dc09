use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ecard_card::ReaderConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod formatters;
mod worker;

use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "ecard")]
#[command(about = "e-card Reader - Read identity data from e-cards over PC/SC")]
#[command(version)]
struct Args {
    /// Output format mode
    #[arg(short, long, value_enum, default_value_t = FormatMode::Human, global = true)]
    format: FormatMode,

    /// Use the first reader whose name contains this text
    #[arg(short, long, global = true)]
    reader: Option<String>,

    /// Open the card in exclusive mode
    #[arg(long, global = true)]
    exclusive: bool,

    /// Maximum bytes per READ BINARY (1-255)
    #[arg(long, default_value_t = 0xFF, value_parser = clap::value_parser!(u8).range(1..), global = true)]
    chunk_size: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read the identity fields (default)
    Read,
    /// Print every entry of the base-data record, sorted by OID
    Dump,
    /// List card readers and whether a card is inserted
    Readers,
    /// Wait for cards and read each one as it is inserted
    Watch {
        /// Stop after the first successful read
        #[arg(long)]
        once: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Set RUST_LOG=debug for APDU traces, RUST_LOG=trace for every chunk
    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = ReaderConfig {
        reader: args.reader,
        exclusive: args.exclusive,
        chunk_size: args.chunk_size,
    };

    let result = match args.command.unwrap_or(Command::Read) {
        Command::Read => commands::read::cmd_read(&config, args.format),
        Command::Dump => commands::dump::cmd_dump(&config, args.format),
        Command::Readers => commands::readers::cmd_readers(&config),
        Command::Watch { once } => commands::watch::cmd_watch(config, args.format, once),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let Some(hint) = commands::hint(&err) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
