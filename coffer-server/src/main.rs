mod config;
mod server;

use clap::{Parser, Subcommand};
use config::Config;
use server::run_server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "Content-addressed object storage with local replication")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coffer_core=info,coffer_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            tracing::info!("starting coffer server with config: {}", config);

            let cfg = match Config::from_file(&config) {
                Ok(c) => c,
                Err(error) => {
                    tracing::error!("failed to load config: {}", error);
                    std::process::exit(1);
                }
            };

            tracing::info!(
                "nodes: {}, replication factor: {}, virtual nodes: {}",
                cfg.storage.node_count,
                cfg.replication.replication_factor,
                cfg.replication.virtual_nodes
            );

            if let Err(error) = run_server(cfg).await {
                tracing::error!("server error: {}", error);
                std::process::exit(1);
            }
        }
    }
}
