use clap::Parser;

/// Caching HTTP/1.0 forward proxy.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// TCP port to listen on for client connections.
    pub port: u16,

    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Colorize log levels.
    #[arg(long)]
    pub colored: bool,
}
