//! Headless tandem peer: runs one session from the command line.
//!
//! There is no window here. The local paddle is either held at its target or,
//! with `--autopilot`, follows the ball.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tandem_app::{
    Autopilot, GameLoop, PlatformDirs, SessionConfig, SessionHandle, stats_text, stop_on_interrupt,
};
use tandem_config::{CliArgs, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match &args.config {
        Some(dir) => PlatformDirs::in_dir(dir),
        None => match PlatformDirs::resolve() {
            Ok(dirs) => dirs,
            Err(e) => {
                eprintln!("failed to resolve platform directories: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let mut config = match Config::load_or_create(&dirs.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config: {e}, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    if let Err(e) = tandem_log::init_logging(
        Some(&dirs.log_dir),
        cfg!(debug_assertions),
        Some(&config),
    ) {
        eprintln!("failed to initialize logging: {e}");
    }
    info!("config dir: {}", dirs.config_dir.display());

    let session_config = match SessionConfig::from_config(&config) {
        Ok(session_config) => session_config,
        Err(e) => {
            error!("invalid network configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let strategy = match session_config.role_strategy() {
        Ok(strategy) => strategy,
        Err(e) => {
            error!("{e}; pass --authority, --replica, or --rendezvous");
            return ExitCode::FAILURE;
        }
    };

    let handle = SessionHandle::new();
    if config.game.autopilot {
        spawn_autopilot(handle.clone());
    }
    if config.debug.show_stats {
        spawn_stats(handle.clone());
    }

    let game_loop = GameLoop::new(
        handle.clone(),
        Duration::from_millis(config.game.frame_interval_ms),
    );
    // Ctrl-C once stops after the current frame; twice gives up on a session
    // stuck waiting for its peer.
    let result = tokio::select! {
        result = game_loop.run(&session_config, strategy.as_ref()) => result,
        () = stop_on_interrupt(handle, tokio::signal::ctrl_c) => {
            error!("session abandoned");
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(summary) => {
            info!(
                "{} finished after {} frames, score {} : {}",
                summary.role, summary.frames, summary.scores.left, summary.scores.right
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("session failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn spawn_autopilot(handle: SessionHandle) {
    let pilot = Autopilot::default();
    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if let Some(role) = snapshot.role {
                handle.set_local_paddle_target(pilot.target(role, &snapshot));
            }
        }
    });
}

fn spawn_stats(handle: SessionHandle) {
    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        let mut every = tokio::time::interval(Duration::from_secs(1));
        loop {
            every.tick().await;
            if snapshots.has_changed().is_err() {
                break;
            }
            info!("{}", stats_text(&snapshots.borrow_and_update()));
        }
    });
}
