use std::error::Error;

use clap::Parser;
use log::{info, LevelFilter};
use relaymesh::{node_id::NodeId, slot::Slot, willingness::Willingness, Config, Node};
#[cfg(target_family = "unix")]
use tokio::signal::{self, unix::SignalKind};

mod metrics;
mod transport;

/// The default UDP port for control traffic.
const DEFAULT_LISTEN_PORT: u16 = 9698;

/// The default willingness to act as relay.
const DEFAULT_WILLINGNESS: u8 = 3;

#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Node id, either a dotted quad (10.0.0.1) or a raw 32 bit value.
    #[arg(short = 'i', long = "id")]
    id: NodeId,

    /// UDP port to send and receive control traffic on.
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_LISTEN_PORT)]
    port: u16,

    /// Willingness to relay traffic for other nodes (0 = never, 7 = always).
    #[arg(short = 'w', long = "willingness", default_value_t = DEFAULT_WILLINGNESS)]
    willingness: u8,

    /// TDMA slot reserved by this node, -1 for none.
    #[arg(short = 's', long = "slot", default_value_t = -1, allow_hyphen_values = true)]
    slot: i32,

    /// Enable debug logging. Does nothing if `--silent` is set.
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,

    /// Disable all logs except error logs.
    #[arg(long = "silent", default_value_t = false)]
    silent: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.silent {
        LevelFilter::Error
    } else if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    pretty_env_logger::formatted_timed_builder()
        .filter_module("relaymesh", level)
        .filter_module("relaymeshd", level)
        .init();

    let config = Config {
        node_id: cli.id,
        willingness: Willingness::new(cli.willingness),
        tdma_slot: Slot::from_raw(cli.slot),
        metrics: metrics::NoMetrics,
    };

    let (node, transport_handle) = Node::new(config);
    info!("Node {} up, control traffic on UDP port {}", cli.id, cli.port);

    let transport = tokio::spawn(transport::run(node, transport_handle, cli.port));

    #[cfg(target_family = "unix")]
    {
        let mut sigint =
            signal::unix::signal(SignalKind::interrupt()).expect("Can install SIGINT handler");
        let mut sigterm =
            signal::unix::signal(SignalKind::terminate()).expect("Can install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => { }
            _ = sigterm.recv() => { }
            res = transport => {
                if let Ok(Err(e)) = res {
                    log::error!("Transport failed: {e}");
                }
            }
        }
    }
    #[cfg(not(target_family = "unix"))]
    {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    log::error!("Failed to wait for SIGINT: {e}");
                }
            }
            res = transport => {
                if let Ok(Err(e)) = res {
                    log::error!("Transport failed: {e}");
                }
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
