use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bucketsync::SyncOptions;

/// Transactional sync between a local directory tree and an object-storage bucket
///
/// Push, pull, and delete files below a configured base path, comparing by
/// content hash and refusing ambiguous overwrites unless forced
#[derive(Parser, Debug)]
#[command(name = "bucketsync")]
#[command(about, long_about = None, version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the YAML configuration file
    #[arg(long, global = true, value_name = "PATH", default_value = "bucketsync.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a local file or directory to the bucket
    Push {
        /// Path relative to the local base dir
        path: String,

        #[command(flatten)]
        options: FilterArgs,
    },

    /// Download a remote file or namespace into the local tree
    Pull {
        /// Path relative to the remote base path
        path: String,

        #[command(flatten)]
        options: FilterArgs,
    },

    /// Delete a remote file or namespace (local files are never touched)
    Delete {
        /// Path relative to the remote base path
        path: String,

        #[command(flatten)]
        options: FilterArgs,
    },

    /// Create the configured bucket
    CreateBucket {
        /// Do not fail if the bucket already exists
        #[arg(long)]
        exist_ok: bool,
    },

    /// Check whether the configured bucket exists
    BucketExists,
}

/// Filter and mode flags shared by push, pull, and delete
#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    /// Preview changes without executing (dry-run)
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite files whose content differs on the other side
    #[arg(long)]
    pub force: bool,

    /// Include glob over relative paths (repeatable; any match includes)
    #[arg(long = "include-glob", value_name = "GLOB")]
    pub include_globs: Vec<String>,

    /// Exclude glob over relative paths (repeatable; any match excludes)
    #[arg(long = "exclude-glob", value_name = "GLOB")]
    pub exclude_globs: Vec<String>,

    /// Include regex; paths must match to participate
    #[arg(long, value_name = "REGEX")]
    pub include_regex: Option<String>,

    /// Exclude regex; matching paths are skipped
    #[arg(long, value_name = "REGEX")]
    pub exclude_regex: Option<String>,
}

impl FilterArgs {
    pub fn to_options(&self) -> SyncOptions {
        SyncOptions {
            dryrun: self.dry_run,
            force: self.force,
            include_globs: self.include_globs.clone(),
            exclude_globs: self.exclude_globs.clone(),
            include_regex: self.include_regex.clone(),
            exclude_regex: self.exclude_regex.clone(),
        }
    }
}
