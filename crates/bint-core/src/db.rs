use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection};
use std::time::Duration;

use crate::config::PostgresConfig;

const IN_MEMORY: &str = "sqlite::memory:";

/// Open the database described by the `postgres` config section and check
/// it answers. Without a section an in-memory SQLite database is opened.
pub async fn connect(config: Option<&PostgresConfig>) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let url = config.map(PostgresConfig::url).unwrap_or_else(|| IN_MEMORY.to_string());
    let mut opts = ConnectOptions::new(url.as_str());
    opts.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8));

    if let Some(cfg) = config {
        if cfg.max_open_conns > 0 {
            opts.max_connections(cfg.max_open_conns);
        }
        if let Some(min) = min_connections(cfg) {
            opts.min_connections(min);
        }
        if cfg.conn_max_lifetime > 1 {
            opts.max_lifetime(Duration::from_secs(cfg.conn_max_lifetime));
        }
        opts.sqlx_logging(cfg.debug);
    } else {
        opts.sqlx_logging(false);
    }

    if url.starts_with(IN_MEMORY) {
        // Every pooled connection would otherwise see its own empty database.
        opts.max_connections(1).min_connections(1);
    }

    let db = SeaDatabase::connect(opts).await?;
    db.execute_unprepared("SELECT 1").await?;
    tracing::info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

/// Idle connections are kept open as the pool minimum, never above the maximum.
fn min_connections(cfg: &PostgresConfig) -> Option<u32> {
    match (cfg.max_idle_conns, cfg.max_open_conns) {
        (0, _) => None,
        (idle, 0) => Some(idle),
        (idle, open) => Some(idle.min(open)),
    }
}
