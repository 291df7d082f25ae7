//! MMU simulator - Main Entry Point
//!
//! Usage: mmu-sim [OPTIONS] <inputfile> [randfile]
//!
//! Arguments:
//!   inputfile - Process/VMA declarations followed by the instruction trace
//!   randfile  - Random numbers for the random pager (required with -ar)
//!
//! Options:
//!   -f<num>      Number of physical frames (1..=128, default 4)
//!   -a<algo>     Replacement algorithm: f r c e a w (default f)
//!   -o<letters>  Output selection: O P F S a x y f
//!   -v           More logging on stderr (repeatable)

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use log::{LevelFilter, Metadata, Record};

use mmu_sim::{Config, OutputOptions, PagerKind, VmManager, DEFAULT_FRAMES};

#[derive(Parser)]
#[command(name = "mmu-sim")]
#[command(about = "Replays a memory access trace through a simulated MMU and pager")]
#[command(version)]
struct Cli {
    /// Number of physical frames
    #[arg(short = 'f', long = "frames", default_value_t = DEFAULT_FRAMES)]
    frames: usize,

    /// Replacement algorithm letter
    #[arg(short = 'a', long = "algorithm", default_value_t = 'f')]
    algorithm: char,

    /// Output option letters
    #[arg(short = 'o', long = "output", default_value = "")]
    output: String,

    /// Log verbosity on stderr
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Input file
    input_file: PathBuf,

    /// Random number file
    random_file: Option<PathBuf>,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn build_config(cli: Cli) -> mmu_sim::Result<Config> {
    let algorithm = PagerKind::from_letter(cli.algorithm)?;
    let mut config = Config::new(cli.input_file);
    config.num_frames = cli.frames;
    config.algorithm = algorithm;
    config.output = OutputOptions::parse(&cli.output)?;
    // only the random pager reads the random file
    if algorithm == PagerKind::Random {
        config.random_file = cli.random_file;
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main logic separated from main() for cleaner error handling
fn run(cli: Cli) -> mmu_sim::Result<()> {
    let config = build_config(cli)?;
    let manager = VmManager::load(config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    manager.run(&mut out)?;
    out.flush()?;
    Ok(())
}
