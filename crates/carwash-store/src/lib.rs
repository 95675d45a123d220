//! Storage adapters the scrub engine reads from and writes back to.

pub mod adapter;
pub mod error;
pub mod memory;
pub mod postgres;

pub use adapter::{Cursor, Page, Storage};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
