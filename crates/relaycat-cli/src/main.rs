//! relaycat — a minimal netcat.
//!
//! Dials or listens for a single TCP or UDP peer and relays bytes between it
//! and stdin/stdout until either side closes. Diagnostics go to stderr.

mod args;
mod commands;
mod config;

use args::{Invocation, Mode};
use clap::Parser;
use config::Config;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// relaycat — relay stdin/stdout over one TCP or UDP connection
#[derive(Parser, Debug)]
#[command(
    name = "relaycat",
    version,
    about = "Relay stdin/stdout over a single TCP or UDP connection",
    override_usage = "relaycat [-lu] [-p source_port] [hostname] <port>"
)]
struct Cli {
    /// Source port to use when connecting
    #[arg(short = 'p', value_name = "PORT")]
    source_port: Option<u16>,

    /// Use UDP instead of TCP
    #[arg(short = 'u')]
    udp: bool,

    /// Listen for an incoming connection instead of connecting
    #[arg(short = 'l')]
    listen: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect mode: <hostname> <port>. Listen mode: <port>
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let invocation = match Invocation::from_args(cli.listen, cli.udp, cli.source_port, &cli.args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("relaycat: {e:#}\n\nUsage: relaycat [-lu] [-p source_port] [hostname] <port>");
            std::process::exit(1);
        }
    };

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let cfg = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("relaycat: {e:#}");
            std::process::exit(1);
        }
    };

    // Initialize tracing. Stdout carries relayed data only.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&cfg.relay.log_level)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Config is read before the subscriber exists, so report it here.
    if config_path.exists() {
        debug!(path = %config_path.display(), "loaded config");
    } else {
        debug!(path = %config_path.display(), "config file not found, using defaults");
    }

    info!(
        protocol = %invocation.protocol,
        mode = ?invocation.mode,
        buffer_size = cfg.relay.buffer_size,
        "starting relaycat"
    );

    let buffer_size = cfg.relay.buffer_size;
    let result = match invocation.mode {
        Mode::Connect { ref host, port } => {
            commands::connect::run(invocation.protocol, host, port, invocation.source_port, buffer_size).await
        }
        Mode::Listen { port } => {
            if let Some(source_port) = invocation.source_port {
                warn!(source_port, "source port is ignored when listening");
            }
            commands::listen::run(invocation.protocol, port, buffer_size).await
        }
    };

    let code = match result {
        Ok(_) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("relaycat: {e:#}");
            1
        }
    };

    // The stdin reader may still be parked in a blocking read that would
    // stall runtime shutdown.
    std::process::exit(code);
}
