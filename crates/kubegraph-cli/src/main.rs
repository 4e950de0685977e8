//! `kubegraph`: a command-line front end over the schema registry and
//! transitive discovery engine, demonstrated against an in-memory fixture
//! cluster rather than a live one. Grounded on `familiar-api`'s
//! `#[tokio::main]` / `tracing_subscriber` bootstrap rather than `xtask`'s,
//! whose developer-tool `println!` texture didn't fit a service-shaped
//! binary.

mod config;
mod fixture;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kubegraph_discovery::CrdDiscoverer;
use kubegraph_engine::{TraversalEngine, TraversalRoot};
use kubegraph_model::ResourceRef;
use serde_json::json;
use tracing::info;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "kubegraph", version, about = "Resource schema registry and transitive discovery engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate CRDs matching the configured API group patterns and print
    /// their parsed schemas and discovery statistics.
    Discover,
    /// Run a bounded traversal outward from a KubeCluster root and print the
    /// resulting graph, metrics, cycle report, and validation result.
    Traverse {
        /// Root resource name.
        #[arg(long, default_value = "prod")]
        name: String,
        /// Root resource namespace.
        #[arg(long, default_value = "default")]
        namespace: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "kubegraph=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let client = Arc::new(fixture::demo_client());

    match cli.command {
        Commands::Discover => run_discover(client, &config).await,
        Commands::Traverse { name, namespace } => run_traverse(client, config, &name, &namespace).await,
    }
}

async fn run_discover(client: Arc<kubegraph_client::FakeClusterClient>, config: &AppConfig) -> anyhow::Result<()> {
    let discoverer = CrdDiscoverer::new(client);
    let crds = discoverer.discover_crds(&config.traversal.api_group_patterns).await?;
    let stats = discoverer.get_discovery_statistics();

    info!(crds = crds.len(), "discovery complete");
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "crds": crds,
            "stats": stats,
        }))?
    );

    Ok(())
}

async fn run_traverse(
    client: Arc<kubegraph_client::FakeClusterClient>,
    config: AppConfig,
    name: &str,
    namespace: &str,
) -> anyhow::Result<()> {
    let root_object = fixture::demo_kube_cluster(name, namespace);
    let root = TraversalRoot::new(
        ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some(namespace.to_string()), name.to_string()),
        root_object,
    );

    let engine = TraversalEngine::new(client, config.traversal);

    match engine.run_traversal(vec![root]).await {
        Ok(result) => {
            info!(
                nodes = result.graph.len(),
                edges = result.graph.edges().len(),
                termination = ?result.termination_reason,
                "traversal complete"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("traversal did not complete cleanly: {err}");
            println!("{}", serde_json::to_string_pretty(err.partial())?);
            std::process::exit(1);
        }
    }
}
