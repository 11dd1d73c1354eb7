/*!
 * StateDB server entry point.
 *
 * Parses CLI flags, binds the listener, and runs the accept loop.
 * This call blocks until the listener errors.
 */

use anyhow::{Context, Result};
use statedb::config::{self, ParseOutcome};
use statedb::exec::SharedDataspace;
use statedb::net;
use statedb::storage::Dataspace;
use std::net::ToSocketAddrs;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = match config::parse(args) {
        Ok(ParseOutcome::Help) => {
            print!("{}", config::USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(ParseOutcome::Run(cfg)) => cfg,
        Err(e) => {
            eprintln!("statedb: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(cfg) {
        eprintln!("statedb: {e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cfg: config::Config) -> Result<()> {
    let addr = (cfg.address.as_str(), cfg.port)
        .to_socket_addrs()
        .with_context(|| format!("resolve {}:{}", cfg.address, cfg.port))?
        .next()
        .with_context(|| format!("no address for {}:{}", cfg.address, cfg.port))?;

    let listener = net::bind_reuseaddr(addr)?;
    let state: SharedDataspace = Arc::new(Mutex::new(Dataspace::new()));
    net::run_server(listener, state)
}
