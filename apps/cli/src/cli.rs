use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "drivecord",
    version,
    about = "Store files as chunked attachments on a Discord channel",
    after_help = "\
Configuration is read from ~/.config/drivecord/config.toml unless --config is given.

Environment variables:
  RUST_LOG          Log filter (default: info)"
)]
pub(crate) struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Upload a local file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Destination directory in the tree, e.g. root/docs
        #[arg(short, long, default_value = "root")]
        dir: String,
    },

    /// Download a stored file into the download folder
    Download {
        /// Identifier shown by `ls`
        file_id: String,
    },

    /// Show the file tree
    Ls {
        /// Expand collapsed directories
        #[arg(short, long)]
        all: bool,
    },

    /// Move a file to another directory
    Mv {
        file_id: String,
        /// Destination directory, created if missing
        dir: String,
    },

    /// Forget a stored file
    Rm { file_id: String },

    /// Delete a directory and everything under it
    Rmdir { name: String },

    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print the current settings (tokens are masked)
    Show,

    /// Set the chunk size in MiB (5-25; anything else resets to 5)
    ChunkSize { mib: String },

    /// Append a bot token
    AddToken { token: String },

    /// Remove the bot token at INDEX (as listed by `config show`)
    RemoveToken { index: usize },

    /// Set the channel id
    Channel { id: String },

    /// Set the server id
    Server { id: String },
}
