pub mod books;

use bookstore_kernel::ModuleRegistry;
use sqlx::PgPool;

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, pool: &PgPool) {
    registry.register(books::create_module(pool.clone()));
}
