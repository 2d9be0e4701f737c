//! CLI: reconstruct a trading bot log and print the dataset as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin reconstruct_trade_log -- logs/bot.log > dataset.json
//!
//! # Keep every warning and write them next to the dataset
//! cargo run --release --bin reconstruct_trade_log -- logs/bot.log \
//!     --diagnostic --warnings warnings.json --pretty > dataset.json
//! ```
//!
//! The dataset goes to stdout; the run summary goes to the log (stderr).
//! Exit status is 1 when the input cannot be read.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use trade_log_reconstructor::{
    FileSource, LogReconstructor, ReconError, ReconstructorConfig, Result,
};

/// Command-line arguments
struct Args {
    /// Log file to reconstruct
    input: PathBuf,
    /// Pretty-print the JSON output
    pretty: bool,
    /// Keep all warnings and log every dropped record
    diagnostic: bool,
    /// Optional warnings export path
    warnings: Option<PathBuf>,
    /// Date the first time of day is placed on
    anchor_date: Option<NaiveDate>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut pretty = false;
    let mut diagnostic = false;
    let mut warnings: Option<PathBuf> = None;
    let mut anchor_date: Option<NaiveDate> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pretty" | "-p" => {
                pretty = true;
            }
            "--diagnostic" | "-d" => {
                diagnostic = true;
            }
            "--warnings" | "-w" => {
                i += 1;
                if i >= args.len() {
                    return Err("--warnings requires a path".to_string());
                }
                warnings = Some(PathBuf::from(&args[i]));
            }
            "--anchor-date" => {
                i += 1;
                if i >= args.len() {
                    return Err("--anchor-date requires a YYYY-MM-DD date".to_string());
                }
                let date = NaiveDate::parse_from_str(&args[i], "%Y-%m-%d")
                    .map_err(|e| format!("Invalid --anchor-date {:?}: {}", args[i], e))?;
                anchor_date = Some(date);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                if input.is_none() {
                    input = Some(PathBuf::from(arg));
                } else {
                    return Err(format!("Unknown argument: {}", arg));
                }
            }
        }
        i += 1;
    }

    let input = input.ok_or("Log file path is required")?;

    Ok(Args {
        input,
        pretty,
        diagnostic,
        warnings,
        anchor_date,
    })
}

fn print_help() {
    eprintln!(
        r#"
Reconstruct Trade Log

Rebuilds price, trade, spread, border and order tables from a
pipe-delimited trading bot log and prints them as JSON.

USAGE:
    reconstruct_trade_log [OPTIONS] <LOG_FILE>

OPTIONS:
    -p, --pretty              Pretty-print the JSON output
    -d, --diagnostic          Keep every warning and log each dropped record
    -w, --warnings <PATH>     Write tracked warnings as JSON to PATH
        --anchor-date <DATE>  Date for the first time of day (default 2024-01-01)
    -h, --help                Print this help message

NOTES:
    - Set RUST_LOG=debug to see individual dropped records
    - The summary is written to stderr; stdout carries only the dataset
"#
    );
}

fn run(args: &Args) -> Result<()> {
    let mut config = if args.diagnostic {
        ReconstructorConfig::diagnostic()
    } else {
        ReconstructorConfig::default()
    };
    if let Some(date) = args.anchor_date {
        config = config.with_anchor_date(date);
    }

    let start = Instant::now();

    let source = FileSource::new(&args.input)?;
    let mut recon = LogReconstructor::with_config(config);
    recon.process_source(source)?;
    let output = recon.finish();

    log::info!(
        "Parsed {} in {:.2}s",
        args.input.display(),
        start.elapsed().as_secs_f64()
    );
    output.log_summary();

    if let Some(path) = &args.warnings {
        output.warnings.export_to_file(path)?;
        log::info!("Warnings written to {}", path.display());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output.dataset.write_json(&mut handle, args.pretty)?;
    writeln!(handle)?;
    handle.flush()?;

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        match &e {
            ReconError::FileUnavailable { .. } => log::error!("{}", e),
            _ => log::error!("Reconstruction failed: {}", e),
        }
        std::process::exit(1);
    }
}
