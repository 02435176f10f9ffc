//! Configuration for a tandem session.
//!
//! Settings persist to disk as a RON file, and command-line flags parsed with
//! clap override whatever the file says.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, DisplayConfig, GameConfig, NetworkConfig};
pub use error::ConfigError;
