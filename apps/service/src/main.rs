mod api;
mod config;
mod database;
mod monitoring;
mod pool;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use clap::Parser;

use crate::api::ApiContext;
use crate::config::{EndpointConfig, load_endpoints};
use crate::database::{LibsqlStore, Store, initialize_database};
use crate::monitoring::{Monitor, Prober};
use crate::pool::{LibsqlManager, LibsqlPool};

#[derive(Debug, Parser)]
#[command(
    name = "upwatch",
    version,
    about = "Periodic HTTP endpoint monitoring with a status API"
)]
struct Cli {
    /// Address to bind the status API on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port for the status API.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Path to the endpoint config (a JSON array of endpoint objects).
    #[arg(long, default_value = "config/endpoints.json")]
    config: PathBuf,

    /// Path to the SQLite database file.
    #[arg(long, default_value = "data/monitor.db")]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    logger::init_tracing();
    let cli = Cli::parse();

    if !cli.config.exists() {
        eprintln!("Config not found: {}", cli.config.display());
        eprintln!(
            "Tip: copy config/endpoints.example.json to {}",
            cli.config.display()
        );
        return ExitCode::from(2);
    }

    let endpoints = match load_endpoints(&cli.config) {
        Ok(endpoints) => endpoints,
        Err(err) => {
            eprintln!("Invalid endpoint config: {err}");
            return ExitCode::from(2);
        }
    };

    match run(cli, endpoints).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, endpoints: Vec<EndpointConfig>) -> Result<()> {
    if let Some(parent) = cli.db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let db_path = cli.db.to_string_lossy().to_string();
    let db = libsql::Builder::new_local(&db_path)
        .build()
        .await
        .with_context(|| format!("failed to open database {db_path}"))?;
    let pool: LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db))
        .build()
        .context("failed to build connection pool")?;
    {
        let conn = pool
            .get()
            .await
            .context("failed to open database connection")?;
        initialize_database(&conn)
            .await
            .context("failed to run migrations")?;
    }

    let store: Arc<dyn Store> = Arc::new(LibsqlStore::new_from_pool(pool));
    let prober = Prober::new().context("failed to build HTTP client")?;
    let monitor = Arc::new(Monitor::new(store.clone(), prober, endpoints));
    monitor.start().await?;

    let ctx = web::Data::new(ApiContext {
        store,
        monitor: monitor.clone(),
    });
    tracing::info!("listening on http://{}:{}", cli.host, cli.port);
    HttpServer::new(move || App::new().app_data(ctx.clone()).configure(api::routes))
        .bind((cli.host.as_str(), cli.port))?
        .run()
        .await?;

    monitor.stop().await;
    Ok(())
}
