use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory (config, databases, task queue).
    /// Defaults to $LINKDOCK_BASE_PATH, then ~/.local/share/linkdock
    #[clap(short, long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP API daemon
    Daemon {},

    /// Resolve the favicon for a URL and print the result
    Resolve {
        /// Page URL to resolve an icon for
        url: String,
    },

    /// Create a user account
    Register {
        username: String,
        email: String,
        password: String,
    },
}
