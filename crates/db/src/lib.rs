//! PostgreSQL connection pool factory and the migration runner used at
//! application start-up.

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use bookstore_kernel::{settings::DatabaseSettings, Migration};

const APPLICATION_NAME: &str = "bookstore";

/// Key for the advisory lock that serializes migration runs across processes.
const MIGRATION_LOCK_KEY: i64 = 0x626f_6f6b_7374_6f72;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module      TEXT        NOT NULL,
        id          TEXT        NOT NULL,
        applied_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (module, id)
    )
"#;

/// Build connection options from settings; `url` wins over discrete fields.
pub fn connect_options(settings: &DatabaseSettings) -> anyhow::Result<PgConnectOptions> {
    let options = match &settings.url {
        Some(url) => url
            .parse::<PgConnectOptions>()
            .with_context(|| "invalid database url")?,
        None => PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.name),
    };

    Ok(options.application_name(APPLICATION_NAME))
}

fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
}

/// Open a bounded pool and verify connectivity.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    tracing::info!(
        target: "bookstore-db",
        database = %settings.display_target(),
        max_connections = settings.max_connections,
        "connecting to PostgreSQL"
    );

    let pool = pool_options(settings)
        .connect_with(connect_options(settings)?)
        .await
        .with_context(|| format!("failed to connect to {}", settings.display_target()))?;

    Ok(pool)
}

/// Build the pool without opening a connection until first use.
pub fn connect_lazy(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    Ok(pool_options(settings).connect_lazy_with(connect_options(settings)?))
}

/// Apply every migration not yet recorded in `schema_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, under a transaction-scoped advisory lock, so two processes starting
/// at once never apply the same script twice. Returns the number applied.
pub async fn migrate(pool: &PgPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(CREATE_MIGRATIONS_TABLE)
        .execute(pool)
        .await
        .with_context(|| "failed to ensure schema_migrations table")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let mut tx = pool
            .begin()
            .await
            .with_context(|| "failed to open migration transaction")?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .with_context(|| "failed to acquire migration lock")?;

        let already_applied: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE module = $1 AND id = $2)",
        )
        .bind(module)
        .bind(migration.id)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to read migration state for {}/{}", module, migration.id))?;

        if already_applied {
            tracing::debug!(target: "bookstore-db", module = %module, id = migration.id, "migration already applied");
            tx.rollback().await?;
            continue;
        }

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {}/{}", module, migration.id))?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {}/{}", module, migration.id))?;

        tracing::info!(target: "bookstore-db", module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
