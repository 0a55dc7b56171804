use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use barberia::api::{self, SharedRepo};
use barberia::config::{Config, StorageKind};
use barberia::db::{Database, SqliteRepository};
use barberia::local::{LocalStore, MockRepository};
use barberia::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = get_subscriber("barberia-d".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let config = Config::from_env()?;
    let repo = repository(&config).await?;

    run(repo, &config).await;

    Ok(())
}

async fn repository(config: &Config) -> Result<SharedRepo> {
    match config.storage {
        StorageKind::Sqlite => {
            let repo = SqliteRepository::new(Database::new(&config.database_url));
            // Connect eagerly so a bad URL shows up in the log at start-up.
            // Requests retry the connection on their own.
            if let Err(e) = repo.pool().await {
                error!(error = %e, "Could not connect to database");
            }
            Ok(Arc::new(repo))
        }
        StorageKind::Mock => {
            let store = match &config.mock_path {
                Some(path) => LocalStore::open(path).await?,
                None => LocalStore::in_memory(),
            };
            Ok(Arc::new(MockRepository::new(store, &config.audit_actor)))
        }
    }
}

async fn run(repo: SharedRepo, config: &Config) {
    let routes = api::routes(repo, config.public_dir.clone());

    info!(
        port = config.port,
        storage = ?config.storage,
        buffer_minutes = config.buffer_minutes,
        "Serving barberia"
    );
    warp::serve(routes).run(([0, 0, 0, 0], config.port)).await;
}
