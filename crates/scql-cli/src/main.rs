//! SCQL card simulator.
//!
//! Runs command APDUs against an in-memory SCQL applet.
//!
//! # Usage
//!
//! ```bash
//! # Execute a single APDU
//! scql -c "00 10 00 80 08 01 54 02 01 61 01 62"
//!
//! # Execute an APDU script, keeping state in an image file
//! scql -f session.apdu --image card.img
//!
//! # Output as JSON
//! scql -o json -f session.apdu
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod formatter;
mod session;

use config::CliConfig;
use formatter::OutputFormat;
use scql_engine::Database;
use session::{Session, Summary};

/// SCQL card simulator
#[derive(Parser, Debug)]
#[command(
    name = "scql",
    author = "SCQL Team",
    version,
    about = "Run SCQL command APDUs against a simulated card",
    long_about = "Runs ISO7816-7 SCQL command APDUs against an in-memory card applet.\n\n\
                  Commands are hex strings, one per line in scripts, with '#' comments.\n\
                  State can be kept across runs in an image file."
)]
struct Args {
    /// Execute a single hex APDU and exit
    #[arg(short = 'c', long, value_name = "APDU")]
    command: Option<String>,

    /// Execute APDUs from a script file, or stdin when "-"
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Image file loaded before and saved after the run
    #[arg(short = 'i', long, value_name = "FILE", env = "SCQL_IMAGE")]
    image: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum)]
    output: Option<OutputFormatArg>,

    /// Stop at the first command that fails
    #[arg(long)]
    stop_on_error: bool,

    /// Do not echo commands
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Readable status lines with decoded rows
    Text,
    /// Raw response bytes in hex
    Hex,
    /// One JSON object per command
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Hex => OutputFormat::Hex,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(summary) if summary.failures == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Summary> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let format = match args.output {
        Some(arg) => arg.into(),
        None => OutputFormat::from_name(&config.output_format)
            .ok_or_else(|| anyhow!("unknown output format '{}'", config.output_format))?,
    };

    let db = open_database(&config)?;
    let mut session = Session::new(db, format)
        .with_echo(config.echo)
        .with_stop_on_error(config.stop_on_error);

    let summary = if let Some(command) = &args.command {
        let (response, rendered) = session.execute(command)?;
        println!("{rendered}");
        Summary {
            commands: 1,
            failures: usize::from(!response.is_success()),
        }
    } else {
        let script = read_script(args.file.as_ref())?;
        session.run_script(&script)?
    };

    if let Some(path) = &config.image {
        session
            .database()
            .save(path)
            .with_context(|| format!("failed to save image {}", path.display()))?;
        info!(path = %path.display(), "image saved");
    }

    Ok(summary)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("scql=debug,scql_apdu=debug,scql_engine=debug")
    } else {
        EnvFilter::new("scql=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)?
    } else {
        CliConfig::load_default()?
    };

    // Command line arguments win over the file
    if let Some(image) = &args.image {
        config.image = Some(image.clone());
    }
    if args.stop_on_error {
        config.stop_on_error = true;
    }
    if args.quiet {
        config.echo = false;
    }

    Ok(config)
}

fn open_database(config: &CliConfig) -> Result<Database> {
    match &config.image {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "loading image");
            Database::load(path, config.engine.clone())
                .with_context(|| format!("failed to load image {}", path.display()))
        }
        _ => Ok(Database::new(config.engine.clone())?),
    }
}

fn read_script(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display())),
        _ => std::io::read_to_string(std::io::stdin()).context("failed to read stdin"),
    }
}
