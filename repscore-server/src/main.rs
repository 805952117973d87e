use clap::Parser;
use repscore_core::config::DatabaseConfig;
use repscore_core::{MemoryStore, PgStore, RepscoreConfig, Store};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use repscore_server::router::ServiceState;
use repscore_server::{http, server, subsystems};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "repscore.toml")]
    config: String,

    /// Check store connectivity and exit
    #[arg(long)]
    health: bool,

    /// Serve from an in-process store instead of Postgres
    #[arg(long)]
    memory: bool,
}

/// `RUST_LOG` wins; otherwise the configured level, falling back to info.
fn log_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(log_level))
}

fn default_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Backend description for `--health`, without touching the schema.
async fn health_report(memory: bool, database: &DatabaseConfig) -> anyhow::Result<String> {
    if memory {
        return Ok(MemoryStore::new().health_check().await?);
    }
    let pool = repscore_core::db::create_pool(database).await?;
    Ok(repscore_core::db::health_check(&pool).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience: production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match RepscoreConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    fmt()
        .with_env_filter(log_filter(&config.service.log_level))
        .init();

    if args.health {
        match health_report(args.memory, &config.database).await {
            Ok(v) => println!("✅ Store reachable: {}", v),
            Err(e) => {
                println!("❌ Store health check failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Repscore health check passed");
        return Ok(());
    }

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("Running on the in-memory store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let pool = match repscore_core::db::create_pool(&config.database).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        };
        repscore_core::db::ensure_schema(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Periodic score refresh
    tokio::spawn(subsystems::refresh::run_refresh_loop(
        store.clone(),
        config.refresh.clone(),
        tx.subscribe(),
    ));

    let socket_path = config.service.socket_path.clone();
    let http_enabled = config.http.enabled;
    let state = Arc::new(ServiceState::new(store, config));

    // HTTP REST API, if enabled
    if http_enabled {
        let http_state = state.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = http::start_http_server(http_state, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    server::run_unix_server(&socket_path, state, tx.subscribe()).await?;

    Ok(())
}
