use anyhow::{Context, Result};
use ccsid_bridge::{Bridge, DEFAULT_LIBC_PATH};
use ccsid_config::project::{OutputConfig, ScanConfig};
use ccsid_config::{Config, ConfigLoader, DumpConfig};
use ccsid_report::UnicodeDatabase;
use clap::{ArgAction, Parser};
use indicatif::ProgressBar;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, info, Level};

mod driver;
mod progress;

/// Dump the UTF-16 conversion table of every EBCDIC CCSID on IBM i.
///
/// Each single- or double-byte CCSID gets an IBM-<ccsid>.txt listing of
/// codepoint, UTF-16 output and character name. Single-byte CCSIDs also get
/// an IBM-<ccsid>.html grid.
///
/// EXAMPLES:
///     ccsid-dump                          Dump CCSIDs 1 to 65534
///     ccsid-dump --ccsid 37 --ccsid 500   Dump two CCSIDs
///     ccsid-dump -o tables --no-html      Text reports only, into tables/
///
/// ENVIRONMENT VARIABLES:
///     CCSID_DUMP_OUTPUT_DIR  Output directory
///     CCSID_DUMP_LIBC        PASE libc member exporting the ILE primitives
///     CCSID_DUMP_HTML        Set to 'false' to skip HTML reports
#[derive(Parser, Debug)]
#[command(name = "ccsid-dump")]
#[command(version)]
struct Cli {
    /// Path to a ccsid-dump.toml (default: search upward from the current directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Directory receiving the reports
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,
    /// Dump only this CCSID (repeatable)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=65535))]
    ccsid: Vec<u32>,
    /// First CCSID of the range
    #[arg(long)]
    first: Option<u32>,
    /// Last CCSID of the range, inclusive
    #[arg(long)]
    last: Option<u32>,
    /// Do not write HTML reports
    #[arg(long)]
    no_html: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Settings given on the command line, for [`Config::apply`]
    fn overrides(&self) -> DumpConfig {
        let mut overrides = DumpConfig::default();

        if self.first.is_some() || self.last.is_some() {
            overrides.scan = Some(ScanConfig {
                first: self.first,
                last: self.last,
                skip: None,
            });
        }

        if self.output_dir.is_some() || self.no_html {
            overrides.output = Some(OutputConfig {
                directory: self.output_dir.clone(),
                html: self.no_html.then_some(false),
            });
        }

        overrides
    }

    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::WARN;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn init_logging(level: Level, bar: &ProgressBar) {
    let bar = bar.clone();
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(move || progress::LogWriter::stderr(bar.clone()))
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    let mut config = match &cli.config {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => loader
            .load_from_directory(&std::env::current_dir()?)
            .context("Failed to load configuration")?,
    };

    config
        .apply(&cli.overrides())
        .context("Invalid command-line settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let bar = progress::progress_bar();
    init_logging(cli.log_level(), &bar);

    let config = load_config(&cli)?;
    if let Some(path) = config.config_path() {
        debug!(path = %path.display(), "using configuration file");
    }

    let libc = config.libc().unwrap_or(DEFAULT_LIBC_PATH);
    let bridge = Bridge::open(libc).context("Failed to load the PASE runtime")?;
    if config.preload() {
        let resolved = bridge.preload().context("Failed to resolve ILE entry points")?;
        debug!(resolved, "preloaded entry points");
    }

    let plan = driver::DumpPlan::from_config(&config, &cli.ccsid);
    info!(
        ccsids = plan.ccsids.len(),
        output = %plan.output_dir.display(),
        "dumping conversion tables"
    );

    let show_progress = !cli.quiet && std::io::stderr().is_terminal();
    progress::show(&bar, plan.ccsids.len(), show_progress);
    let summary = driver::run(&bridge, &plan, &UnicodeDatabase, &bar);

    if !cli.quiet {
        println!("{}", summary);
    }

    Ok(())
}
