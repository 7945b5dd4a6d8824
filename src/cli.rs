use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "p5restore",
    version,
    about = "Restore media referenced by ALE, AAF and EDL files from a P5 archive",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (explicit flag)
  2. $P5RESTORE_CONFIG           (environment variable, .env is honored)
  3. ./p5restore.json"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides P5RESTORE_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Restore every metadata file waiting in <base>/restore
    Run {
        /// Resolve volumes but do not submit any job
        #[arg(long)]
        dry: bool,

        /// Mail the full log of every processed file
        #[arg(long)]
        send_log: bool,

        /// Base directory (overrides base_dir from the config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Restore a single metadata file, printing progress as it happens
    Restore {
        file: PathBuf,

        /// Resolve volumes but do not submit the job
        #[arg(long)]
        dry: bool,

        /// Only restore these items (repeatable)
        #[arg(short, long = "item")]
        items: Vec<String>,
    },

    /// Print the items a metadata file references
    Parse {
        file: PathBuf,

        /// Sort and drop repeated items
        #[arg(long)]
        unique: bool,
    },

    /// List archive plan names
    Plans,

    /// Send a test mail to the configured recipients
    TestMail,
}
