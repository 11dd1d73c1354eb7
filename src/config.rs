/*!
 * Command-line flag parsing.
 *
 * `-h`/`--help` prints usage and the caller should exit 0. `-a`/
 * `--address` and `-p`/`--port` override the listen address/port
 * (defaults `127.0.0.1:8080`). No third-party argument parser is
 * pulled in for three flags; this mirrors how small the flag surface
 * actually is.
 */

use thiserror::Error;

use crate::{DEFAULT_ADDR, DEFAULT_PORT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Either a ready-to-run config, or a request to print help and exit.
pub enum ParseOutcome {
    Run(Config),
    Help,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value for '{0}'")]
    MissingValue(String),
    #[error("invalid port '{0}': {1}")]
    InvalidPort(String, std::num::ParseIntError),
    #[error("unrecognized argument '{0}'")]
    UnrecognizedArgument(String),
}

pub const USAGE: &str = "\
statedb - in-memory key-value store with a Redis-compatible wire protocol

USAGE:
    statedb [OPTIONS]

OPTIONS:
    -a, --address <STR>   listen address (default: 127.0.0.1)
    -p, --port <INT>      listen port (default: 8080)
    -h, --help            print this message and exit
";

/// Parse CLI arguments (excluding argv[0]).
pub fn parse<I, S>(args: I) -> Result<ParseOutcome, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cfg = Config::default();
    let mut iter = args.into_iter().map(|s| s.as_ref().to_string());
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            "-a" | "--address" => {
                let v = iter
                    .next()
                    .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                cfg.address = v;
            }
            "-p" | "--port" => {
                let v = iter
                    .next()
                    .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                cfg.port = v
                    .parse()
                    .map_err(|e| ConfigError::InvalidPort(v.clone(), e))?;
            }
            other => return Err(ConfigError::UnrecognizedArgument(other.to_string())),
        }
    }
    Ok(ParseOutcome::Run(cfg))
}
