use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Default upper bound on pooled connections when `DB_POOL_SIZE` is unset.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Panics when the pool cannot be built; only called at startup and in tests.
pub fn create_pool(database_url: &str, max_size: u32) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size.max(1))
        .build(manager)
        .expect("Failed to create database connection pool")
}
