//! CLI binary for searsia.

use std::path::PathBuf;
use std::pin::pin;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use searsia::config::default_config_path;
use searsia::output::{format_event, format_event_json};
use searsia::{ClientConfig, build_aggregator};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Searsia: federated search from the command line.
#[derive(Parser)]
#[command(name = "searsia", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "SEARSIA_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Search the federation and print results as they arrive.
    Search {
        /// Query terms.
        #[arg(required = true)]
        query: Vec<String>,

        /// Restrict results to one result type, e.g. `images`.
        #[arg(long = "resource-type")]
        result_type: Option<String>,

        /// Result page to request.
        #[arg(long)]
        page: Option<u32>,

        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Fetch the federation description and prefetch its resources.
    Connect,

    /// List cached resources of the current federation.
    Resources,

    /// Forget every cached resource.
    Forget,

    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so search output stays pipeable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("searsia=info,searsia_search=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    if let Command::InitConfig { force } = cli.command {
        return init_config(&config_path, force);
    }

    let config = ClientConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command {
        Command::Search {
            query,
            result_type,
            page,
            json,
        } => run_search(config, &query.join(" "), result_type, page, json).await,
        Command::Connect => connect(config).await,
        Command::Resources => list_resources(config),
        Command::Forget => forget(config),
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn run_search(
    mut config: ClientConfig,
    query: &str,
    result_type: Option<String>,
    page: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    if result_type.is_some() {
        config.aggregator.result_type = result_type;
    }
    if let Some(page) = page {
        config.aggregator.start_page = page;
    }
    let aggregator = build_aggregator(&config)?;

    let mut failed = false;
    let mut events = pin!(aggregator.search(query));
    while let Some(event) = events.next().await {
        if matches!(event, searsia_search::SearchEvent::Error { .. }) {
            failed = true;
        }
        if json {
            println!("{}", format_event_json(&event)?);
        } else if let Some(text) = format_event(&event) {
            println!("{text}");
        }
    }
    if failed {
        anyhow::bail!("search failed");
    }
    Ok(())
}

async fn connect(config: ClientConfig) -> anyhow::Result<()> {
    let aggregator = build_aggregator(&config)?;
    match aggregator.connect().await? {
        Some(mother) => {
            println!("Connected to {} ({})", mother.display_name(), mother.id);
            println!(
                "{} resources cached",
                aggregator.cache().resource_ids().len()
            );
        }
        None => println!("Federation did not describe itself; nothing cached."),
    }
    Ok(())
}

fn list_resources(config: ClientConfig) -> anyhow::Result<()> {
    let aggregator = build_aggregator(&config)?;
    let cache = aggregator.cache();
    let Some(federation) = cache.federation_id() else {
        println!("No federation cached. Run `searsia connect` first.");
        return Ok(());
    };
    println!("Federation: {federation}");
    for id in cache.resource_ids() {
        let Some(resource) = cache.get(&id) else {
            continue;
        };
        let mut line = format!("  {id}  {}", resource.display_name());
        if let Some(display) = resource.display_type {
            line.push_str(&format!("  [{display}]"));
        }
        if let Some(error) = &resource.error {
            line.push_str(&format!("  (last error: {error})"));
        }
        println!("{line}");
    }
    Ok(())
}

fn forget(config: ClientConfig) -> anyhow::Result<()> {
    let aggregator = build_aggregator(&config)?;
    aggregator.cache().reset();
    info!("resource cache cleared");
    println!("Forgot all cached resources.");
    Ok(())
}

fn init_config(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    ClientConfig::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
