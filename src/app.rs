//! Application bootstrap and lifecycle.

use anyhow::Context;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::PgPool;

use crate::modules;

/// A configured application: settings, the shared pool and every module.
pub struct Application {
    settings: Settings,
    pool: PgPool,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the database and register all modules.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookstore_db::connect(&settings.database).await?;
        Ok(Self::with_pool(settings, pool))
    }

    /// Register all modules over an existing pool.
    pub fn with_pool(settings: Settings, pool: PgPool) -> Self {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &pool);

        Self {
            settings,
            pool,
            registry,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending module migrations; returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = bookstore_db::migrate(&self.pool, &migrations)
            .await
            .with_context(|| "failed to apply migrations")?;

        tracing::info!(applied, total = migrations.len(), "migrations complete");
        Ok(applied)
    }

    /// Run init, migrations and start for every module. Any failure,
    /// including catalog seeding, aborts start-up.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.pool,
        };

        self.registry.init_modules(&ctx).await?;
        self.migrate().await?;
        self.registry.start_modules(&ctx).await?;

        Ok(())
    }

    /// Prepare, serve until a shutdown signal, then stop modules and close
    /// the pool.
    pub async fn run(self) -> anyhow::Result<()> {
        self.prepare().await?;

        let served = bookstore_http::start_server(
            &self.registry,
            &self.settings,
            bookstore_http::shutdown_signal(),
        )
        .await;

        let stopped = self.registry.stop_modules().await;
        self.pool.close().await;
        tracing::info!("bookstore-app stopped");

        served.and(stopped)
    }
}
