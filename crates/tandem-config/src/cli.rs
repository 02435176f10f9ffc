//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments. Values given here override `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tandem", about = "Two-peer lockstep pong")]
pub struct CliArgs {
    /// Run as the authority (owns the ball, listens for the peer).
    #[arg(long, conflicts_with = "replica")]
    pub authority: bool,

    /// Run as the replica (mirrors the authority, connects to it).
    #[arg(long)]
    pub replica: bool,

    /// Address of the authority peer.
    #[arg(long)]
    pub rendezvous: Option<String>,

    /// TCP port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Address the authority listens on.
    #[arg(long)]
    pub bind: Option<String>,

    /// Let the local paddle follow the ball.
    #[arg(long)]
    pub autopilot: bool,

    /// Minimum milliseconds between frames (0 = unpaced).
    #[arg(long)]
    pub frame_interval_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.authority {
            self.network.authority = Some(true);
        } else if args.replica {
            self.network.authority = Some(false);
        }
        if let Some(ref addr) = args.rendezvous {
            self.network.rendezvous_address = Some(addr.clone());
        }
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(ref bind) = args.bind {
            self.network.bind_address = bind.clone();
        }
        if args.autopilot {
            self.game.autopilot = true;
        }
        if let Some(ms) = args.frame_interval_ms {
            self.game.frame_interval_ms = ms;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
