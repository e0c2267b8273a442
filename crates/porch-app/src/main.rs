//! Porch: a small interactive home terminal served over the network.
//!
//! Visitors connect, get a prompt, and run the commands declared in
//! the command-manifest directory. Startup wiring lives here; the
//! interesting machinery is in porch-term (session engine),
//! porch-commands (registry), and porch-text (rendering).

mod config;
mod server;
mod transport;

use std::sync::Arc;

use tokio::sync::mpsc;

use porch_commands::RegistryBuilder;

use config::Config;
use server::Server;
use transport::PlainTransport;

fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => fatal(&err),
    };

    // The registry is built before any connection is accepted and
    // never changes afterwards.
    let registry = match RegistryBuilder::new().load_dir(&config.commands_dir) {
        Ok(builder) => Arc::new(builder.build()),
        Err(err) => fatal(&err),
    };
    if registry.is_empty() {
        log::warn!(
            "no commands loaded from {}",
            config.commands_dir.display()
        );
    }

    let welcome = match config.load_welcome() {
        Ok(welcome) => welcome,
        Err(err) => {
            log::warn!("could not read welcome file, using default greeting: {err}");
            None
        }
    };

    // Key material is checked before any socket is opened; a missing
    // host key is fatal misconfiguration, not a per-connection error.
    let transport = match PlainTransport::new(&config.key_file) {
        Ok(transport) => Arc::new(transport),
        Err(err) => fatal(&err),
    };
    let server = Server::new(registry, transport, welcome, config.port);

    // The sender stays alive for the life of the process; the server
    // stops if it is ever signaled or dropped.
    let (_stop_tx, stop_rx) = mpsc::channel(1);
    if let Err(err) = server.run(stop_rx) {
        fatal(&err);
    }
}

fn fatal(err: &dyn std::error::Error) -> ! {
    eprintln!("fatal: {err}");
    std::process::exit(1);
}
