//! Entry point for the `psadwatchd` binary.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use psadwatch_config::DEFAULT_CONFIG_PATH;
use psadwatchd::run_watchdog;

/// Keeps psad, kmsgsd and diskmond running.
#[derive(Debug, Parser)]
#[command(name = "psadwatchd", version, about)]
struct Cli {
    /// Configuration file to load and watch for changes.
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: Utf8PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Err(error) = run_watchdog(&cli.config);
    tracing::error!(
        target: concat!(env!("CARGO_PKG_NAME"), "::main"),
        error = %error,
        "watchdog terminated"
    );
    writeln!(io::stderr().lock(), "psadwatchd: {error}").ok();
    ExitCode::FAILURE
}
