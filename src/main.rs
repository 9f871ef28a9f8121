//! dropmirror CLI entry point.

use clap::Parser;
use colored::Colorize;
use dropmirror::cli::commands;
use dropmirror::cli::Cli;
use dropmirror::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet, cli.no_color);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red().bold(), e.message(cli.verbose > 0));
            if let Some(hint) = e.hint() {
                eprintln!("  Hint: {hint}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Log to stdout, so warnings interleave with progress output.
fn init_tracing(verbose: u8, quiet: bool, no_color: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        const QUIET_DEPS: &str = "rusqlite=info,reqwest=info,hyper=info,hyper_util=info,rustls=info";
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new(format!("debug,{QUIET_DEPS}")),
            3 => EnvFilter::new(format!("trace,{QUIET_DEPS}")),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_ansi(!no_color)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    if cli.version {
        commands::version::execute();
        return Ok(());
    }
    commands::mirror::execute(cli)
}
