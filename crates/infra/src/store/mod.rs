//! Domain stores behind the `SessionFactory` / `DataSession` ports.

mod in_memory;
mod postgres;

pub use in_memory::{InMemorySession, InMemoryStore};
pub use postgres::{PgSession, PgSessionFactory};
