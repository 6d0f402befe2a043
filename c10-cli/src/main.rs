//! Chapter 10 CLI Application
//!
//! Command-line front end for the c10-decoder library. It adds:
//! - `grep`: search 1553 messages for a value (or dump every value) with
//!   correlated timestamps, and dump ARINC-429 traffic
//! - `allbus`: rewrite a recording so every 1553 message is on one bus

use anyhow::{Context, Result};
use c10_decoder::{Bus, Decoder};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod correlator;
mod discover;
mod filter;
mod progress;
mod report;
mod rewrite;
mod search;
#[cfg(test)]
mod test_support;

use config::AppConfig;
use filter::{Filter, MatchValue};
use progress::{LogProgress, ProgressObserver, Silent};
use report::{Output, OutputFormat};
use rewrite::RewriteError;
use search::Searcher;

/// Chapter 10 tools - search and rewrite IRIG 106 Chapter 10 recordings
#[derive(Parser, Debug)]
#[command(name = "c10-cli")]
#[command(about = "Search and rewrite IRIG 106 Chapter 10 recordings", long_about = None)]
#[command(version)]
struct Args {
    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search 1553 messages for a value
    Grep(GrepArgs),
    /// Move every 1553 message onto bus A (or B)
    Allbus(AllbusArgs),
}

#[derive(clap::Args, Debug)]
struct GrepArgs {
    /// Value to search for (decimal, 0x hex, or * to print every value)
    #[arg(value_parser = config::parse_match_value)]
    value: MatchValue,

    /// Recordings or directories to search
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Only search this channel
    #[arg(short, long, value_parser = config::parse_u16)]
    channel: Option<u16>,

    /// Only search messages with this 1553 command word
    #[arg(long, value_parser = config::parse_u16)]
    cmd: Option<u16>,

    /// Only search this bus (1553: 0 = A, 1 = B; higher values only match
    /// ARINC-429 bus numbers)
    #[arg(short, long, value_parser = config::parse_u8)]
    bus: Option<u8>,

    /// Index of the word to compare (0 = command word)
    #[arg(short, long, value_parser = config::parse_usize)]
    word_offset: Option<usize>,

    /// Mask applied to the word before comparing
    #[arg(short, long, value_parser = config::parse_u16)]
    mask: Option<u16>,

    /// Write timestamps to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,

    /// Scan files in parallel (output order is not kept)
    #[arg(short = 'x', long)]
    parallel: bool,

    /// Path to configuration file (config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Year assumed for time packets that only carry day of year
    #[arg(long)]
    year: Option<i32>,
}

#[derive(clap::Args, Debug)]
struct AllbusArgs {
    /// Recording to read
    src: PathBuf,

    /// Recording to write
    dst: PathBuf,

    /// Put messages on bus B instead of bus A
    #[arg(short = 'b')]
    bus_b: bool,

    /// Overwrite the destination if it exists
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::debug!("Chapter 10 CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", c10_decoder::VERSION);

    match args.command {
        Command::Grep(grep) => run_grep(grep, args.quiet),
        Command::Allbus(allbus) => run_allbus(allbus, args.quiet),
    }
}

fn run_grep(args: GrepArgs, quiet: bool) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    // Flags override the configuration file
    let filter = Filter::new(args.value)
        .with_channel(args.channel.or(config.filter.channel))
        .with_command_word(args.cmd.or(config.filter.cmd))
        .with_bus(args.bus.or(config.filter.bus))
        .with_word_offset(args.word_offset.or(config.filter.word_offset).unwrap_or(0))
        .with_mask(args.mask.or(config.filter.mask));
    if filter.excludes_all_1553() {
        log::warn!(
            "Bus {} is neither 0 (A) nor 1 (B); no 1553 message will match",
            filter.bus.unwrap_or_default()
        );
    }
    let format = args.format.unwrap_or(config.output.format);
    let force = args.force || config.output.force;
    let parallel = args.parallel || config.output.parallel;
    let year = args.year.unwrap_or(config.time.year);

    let output = match args.output.or(config.output.file) {
        Some(path) => Output::to_file(&path, force, format)?,
        None => Output::stdout(format),
    };

    let files = discover::collect_files(&args.paths).context("Failed to list input files")?;

    let banner = format!("{} in {} files...", filter.describe(), files.len());
    announce(format, &banner);

    let searcher = Searcher::new(filter, Decoder::with_config(config.decoder), output, year);
    let progress = observer(quiet);
    let outcome = if parallel {
        searcher.run_parallel(&files, progress.as_ref())
    } else {
        searcher.run_sequential(&files, progress.as_ref())?
    };

    for summary in &outcome.summaries {
        log::info!(
            "{}: {} bytes, {} packets, {} messages, {} matches ({} messages and {} packets skipped, {} resyncs, {} bad time packets)",
            summary.path.display(),
            summary.bytes,
            summary.packets,
            summary.messages,
            summary.matches,
            summary.skipped_messages,
            summary.skipped_packets,
            summary.resyncs,
            summary.rejected_time_packets
        );
    }
    announce(format, "\nfinished");

    if outcome.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        let failed: Vec<_> = outcome
            .failures
            .iter()
            .map(|f| f.path().display().to_string())
            .collect();
        log::error!(
            "{} of {} files could not be searched: {}",
            failed.len(),
            files.len(),
            failed.join(", ")
        );
        Ok(ExitCode::FAILURE)
    }
}

fn run_allbus(args: AllbusArgs, quiet: bool) -> Result<ExitCode> {
    let bus = if args.bus_b { Bus::B } else { Bus::A };
    log::info!(
        "Moving all 1553 messages in {} to bus {}",
        args.src.display(),
        bus
    );

    let progress = observer(quiet);
    let summary = match rewrite::rewrite_file(
        &Decoder::new(),
        &args.src,
        &args.dst,
        bus,
        args.force,
        progress.as_ref(),
    ) {
        Ok(summary) => summary,
        // Already name the file; reported as a single line
        Err(e @ (RewriteError::DestinationExists(_) | RewriteError::SameFile(_))) => {
            return Err(e.into())
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to rewrite {}", args.src.display())))
        }
    };

    log::info!(
        "{}: {} bytes, {} packets rewritten ({} messages, {} filler bytes), {} copied, {} passed through",
        args.dst.display(),
        summary.bytes,
        summary.packets_rewritten,
        summary.messages_rewritten,
        summary.filler_bytes,
        summary.packets_copied,
        summary.packets_passed_through
    );
    Ok(ExitCode::SUCCESS)
}

fn observer(quiet: bool) -> Box<dyn ProgressObserver> {
    if quiet {
        Box::new(Silent)
    } else {
        Box::new(LogProgress::new())
    }
}

/// Status lines go to stdout for text output and to the log for JSON
fn announce(format: OutputFormat, line: &str) {
    match format {
        OutputFormat::Txt => println!("{}", line),
        OutputFormat::Json => log::info!("{}", line.trim()),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
