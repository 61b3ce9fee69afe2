//! PostgreSQL connection management.

pub mod pool;

pub use pool::{connect, create_pool, run_migrations, verify_schema, DatabaseError};
