use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use gitsource_core::SourceConfig;
use gitsource_git::synchronize;
use gitsource_graph::MemoryGraph;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitsource")]
#[command(about = "Source a git repository into a content graph", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone or update a repository, index its history, then watch it
    Sync {
        /// Session name; also namespaces the local checkout
        #[arg(short, long)]
        name: Option<String>,

        /// Remote repository url
        #[arg(short, long)]
        remote: Option<String>,

        /// TOML configuration file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Glob selecting which files participate in sourcing
        #[arg(long)]
        patterns: Option<String>,

        /// Extra ignore globs, merged with the built-in set
        #[arg(long)]
        ignore: Vec<String>,

        /// Parent directory for local checkouts
        #[arg(long, env = "GITSOURCE_CACHE")]
        cache_dir: Option<PathBuf>,

        /// Skip TLS certificate verification (explicit opt-in)
        #[arg(long)]
        insecure: bool,

        /// Local primary branch name
        #[arg(long)]
        local_branch: Option<String>,

        /// Remote-tracking primary branch name
        #[arg(long)]
        remote_branch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Sync {
            name,
            remote,
            config,
            patterns,
            ignore,
            cache_dir,
            insecure,
            local_branch,
            remote_branch,
        } => {
            let mut config = match config {
                Some(path) => SourceConfig::from_toml_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => {
                    let name = name.clone().context("--name is required without --config")?;
                    let remote = remote
                        .clone()
                        .context("--remote is required without --config")?;
                    SourceConfig::new(name, remote)
                }
            };
            if let Some(name) = name {
                config.name = name;
            }
            if let Some(remote) = remote {
                config.remote = remote;
            }
            if let Some(patterns) = patterns {
                config.patterns = patterns;
            }
            config.ignore.extend(ignore);
            if let Some(cache_dir) = cache_dir {
                config.cache_dir = Some(cache_dir);
            }
            if insecure {
                config.verify_certificates = false;
            }
            if let Some(local_branch) = local_branch {
                config.local_branch = local_branch;
            }
            if let Some(remote_branch) = remote_branch {
                config.remote_branch = remote_branch;
            }
            config.validate()?;

            let graph = Arc::new(MemoryGraph::new());
            let session = synchronize(config, graph.clone()).await?;
            session.bootstrap_finished();

            println!(
                "{} {}",
                "synced".green().bold(),
                session.remote().web_link.bold()
            );
            println!("  checkout: {}", session.local_path().display());
            println!("  nodes:    {}", graph.node_count());
            println!("watching for changes, press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            session.shutdown();
        }
    }
    Ok(())
}
