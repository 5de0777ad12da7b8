//! inventory-sync - runs sync cycles against the inventory server.
//!
//! Usage: `inventory-sync [pull|push|check]` (defaults to `pull`).

use inventory_client::{Config, HttpTransport, InventoryService, SqliteStore, SyncCoordinator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_client=info,inventory_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "pull".to_string());

    tracing::info!("Opening local store {}", config.database_url);
    let store = SqliteStore::connect(&config.database_url).await?;
    let service = InventoryService::new(store);
    let transport = HttpTransport::from_config(&config);
    let sync = SyncCoordinator::new(service, transport, config.request_timeout);

    match command.as_str() {
        "pull" => {
            let report = sync.sync().await?;
            for (collection, merged) in &report.merged {
                tracing::info!(
                    "{}: {} inserted, {} updated, {} skipped",
                    collection,
                    merged.inserted,
                    merged.updated,
                    merged.skipped.len()
                );
            }
            if let Some(reason) = &report.check_error {
                tracing::error!("Local ledger could not be checked after sync: {}", reason);
            }
            if !report.inconsistencies.is_empty() {
                tracing::warn!(
                    "{} inconsistencies found, run `inventory-sync check` to repair",
                    report.inconsistencies.len()
                );
            }
        }
        "push" => {
            sync.push_all().await?;
        }
        "check" => {
            let report = sync.service().repair().await?;
            tracing::info!("Repaired {} inconsistencies", report.fixed.len());
        }
        other => {
            return Err(format!("unknown command: {other} (expected pull, push or check)").into());
        }
    }

    Ok(())
}
