mod cli;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bucketsync::{FsBackend, RemoteStorage, RemoteStorageConfig};
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RemoteStorageConfig::load(&cli.config)?;
    let engine = match config.provider.as_str() {
        // The bundled provider maps the bucket to a directory under `key`
        "local" | "fs" => RemoteStorage::new(
            FsBackend::new(config.key.clone(), config.bucket.clone()),
            config,
        ),
        other => anyhow::bail!(
            "unsupported provider '{other}': the CLI ships with the 'local' provider only; \
             implement StorageBackend for your provider and use the library API"
        ),
    };

    match &cli.command {
        Commands::Push { path, options } => {
            let summary = engine
                .push(path, &options.to_options())
                .with_context(|| format!("Failed to push '{path}'"))?;
            println!("{}", summary.to_json()?);
        }
        Commands::Pull { path, options } => {
            let summary = engine
                .pull(path, &options.to_options())
                .with_context(|| format!("Failed to pull '{path}'"))?;
            println!("{}", summary.to_json()?);
        }
        Commands::Delete { path, options } => {
            let deleted = engine
                .delete(path, &options.to_options())
                .with_context(|| format!("Failed to delete '{path}'"))?;
            println!("{}", serde_json::to_string_pretty(&deleted)?);
        }
        Commands::CreateBucket { exist_ok } => {
            engine
                .create_bucket(*exist_ok)
                .context("Failed to create bucket")?;
            println!("Bucket ready");
        }
        Commands::BucketExists => {
            println!("{}", engine.bucket_exists()?);
        }
    }

    Ok(())
}
