//! CLI argument parsing

use crate::io::config::load_options;
use crate::services::source::SyntheticLayout;
use crate::{ImportOptions, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_TARGET"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "treeimport")]
#[command(about = "Concurrent bulk importer for folder trees")]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a directory tree from the local filesystem
    Import(ImportArgs),
    /// Import a generated tree to measure throughput
    Synthetic(SyntheticArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Directory to import
    pub source: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args)]
pub struct SyntheticArgs {
    /// Levels of folders below the generated root
    #[arg(long, default_value_t = 3)]
    pub depth: u32,

    /// Sub-folders per folder
    #[arg(long, default_value_t = 4)]
    pub folders: u32,

    /// Documents per folder
    #[arg(long, default_value_t = 10)]
    pub leaves: u32,

    /// Size of each generated document in bytes
    #[arg(long, default_value_t = 1024)]
    pub leaf_size: u64,

    /// Name of the generated root folder
    #[arg(long, default_value = "synthetic")]
    pub root_name: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl SyntheticArgs {
    #[must_use]
    pub fn layout(&self) -> SyntheticLayout {
        SyntheticLayout {
            depth: self.depth,
            folders_per_folder: self.folders,
            leaves_per_folder: self.leaves,
            leaf_size: self.leaf_size,
        }
    }
}

/// Flags shared by every import command
#[derive(Debug, Default, Args)]
pub struct EngineArgs {
    /// JSON file with import options; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Destination path inside the target store
    #[arg(long = "dest", value_name = "PATH")]
    pub destination: Option<String>,

    /// Create the destination path if it does not exist
    #[arg(long)]
    pub create_dest: bool,

    #[arg(long, env = "TREEIMPORT_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Number of worker threads
    #[arg(long, env = "TREEIMPORT_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Queued tasks allowed before forking workers block
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Per-transaction timeout in seconds
    #[arg(long = "tx-timeout", value_name = "SECS")]
    pub transaction_timeout_secs: Option<u64>,

    /// Import the source root's children directly into the destination
    #[arg(long)]
    pub skip_root_container: bool,

    #[arg(long)]
    pub job_name: Option<String>,

    #[arg(long)]
    pub repository: Option<String>,

    /// Skip nodes whose name matches this regex (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    pub excludes: Vec<String>,

    /// Record file names and sizes only, without content
    #[arg(long)]
    pub no_content: bool,

    /// Exit with an error when any worker fails
    #[arg(long)]
    pub fail_on_worker_error: bool,

    /// Queue depth at which no more subtrees are forked
    #[arg(long)]
    pub max_fork_queue_depth: Option<usize>,

    /// Seconds between throughput reports
    #[arg(long, value_name = "SECS")]
    pub progress_interval: Option<u64>,

    /// Write a JSON manifest of the imported entries
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl EngineArgs {
    /// Build import options from the config file (if any) and the flags.
    pub fn resolve_options(&self) -> Result<ImportOptions> {
        let mut opts = match &self.config {
            Some(path) => load_options(path)?,
            None => ImportOptions::default(),
        };

        if let Some(dest) = &self.destination {
            opts.destination_path.clone_from(dest);
        }
        if let Some(batch_size) = self.batch_size {
            opts.batch_size = batch_size;
        }
        if let Some(pool_size) = self.pool_size {
            opts.pool_size = pool_size;
        }
        if let Some(capacity) = self.queue_capacity {
            opts.queue_capacity = capacity;
        }
        if let Some(timeout) = self.transaction_timeout_secs {
            opts.transaction_timeout_secs = timeout;
        }
        if let Some(job_name) = &self.job_name {
            opts.job_name.clone_from(job_name);
        }
        if let Some(repository) = &self.repository {
            opts.repository.clone_from(repository);
        }
        if let Some(depth) = self.max_fork_queue_depth {
            opts.max_fork_queue_depth = depth;
        }
        if let Some(secs) = self.progress_interval {
            opts.progress_interval_ms = secs.saturating_mul(1000);
        }
        opts.create_destination |= self.create_dest;
        opts.skip_root_container_creation |= self.skip_root_container;
        opts.fail_on_worker_error |= self.fail_on_worker_error;

        opts.validate()?;
        Ok(opts)
    }
}
