//! Walkthrough entry point.
//!
//! Usage: `ormtour_cli [--echo] [--legacy] [URL]`
//!
//! `URL` defaults to an in-memory store. `--echo` logs every statement to
//! stderr; `--legacy` turns off commit-as-you-go on raw connections.

mod walkthrough;

use ormtour_core::{default_log_level, init_stderr_logging, StoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match parse_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let level = if config.echo { "info" } else { default_log_level() };
    if let Err(err) = init_stderr_logging(level) {
        eprintln!("logging disabled: {err}");
    }

    let stdout = std::io::stdout();
    match walkthrough::run(config, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("walkthrough failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<StoreConfig, String> {
    let mut config = StoreConfig::default();
    let mut url = None;
    for arg in args {
        match arg.as_str() {
            "--echo" => config = config.with_echo(true),
            "--legacy" => config = config.with_future(false),
            flag if flag.starts_with("--") => return Err(format!("unknown flag `{flag}`")),
            other => {
                if url.replace(other.to_string()).is_some() {
                    return Err(format!("unexpected argument `{other}`"));
                }
            }
        }
    }
    if let Some(url) = url {
        config.url = url;
    }
    config.parse_location().map_err(|err| err.to_string())?;
    Ok(config)
}
