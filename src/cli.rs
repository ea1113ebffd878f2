use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::participant::ParticipantOrder;

/// wheel-debug — interactive harness for steering wheel force feedback
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path (default: ~/.config/wheel_ffb/config.yml)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Seat whose inputs are read and where test forces go
    #[arg(short = 'p', long = "participant", default_value = "A")]
    pub participant: ParticipantOrder,

    /// Vendor wrapper library, overrides provider.library from the config
    #[arg(long = "library")]
    pub library: Option<PathBuf>,

    /// Log the input line on every tick
    #[arg(long = "log-every-frame", default_value = "false")]
    pub log_every_frame: bool,

    /// Send logs to syslog instead of stderr
    #[arg(long = "syslog", default_value = "false")]
    pub syslog: bool,

    /// Maximum log level
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: LevelFilter,
}
