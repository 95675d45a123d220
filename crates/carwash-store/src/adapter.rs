use async_trait::async_trait;

use carwash_core::{Record, Value};

use crate::error::StorageResult;

/// Position to resume paging from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Number of records already returned (positional stores).
    Offset(usize),
    /// Last key value returned (keyset pagination).
    After(Value),
}

/// One bounded chunk of a table.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    /// `None` once the table is exhausted.
    pub next: Option<Cursor>,
}

/// Tabular store the engine scrubs.
///
/// Implementations must be safe to share across concurrently processed
/// tables; the engine never touches the same table from two workers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Names of all tables the store can page through.
    async fn list_tables(&self) -> StorageResult<Vec<String>>;

    /// Primary-key column used to address records of `table`.
    async fn primary_key(&self, table: &str) -> StorageResult<String>;

    /// Fetch at most `page_size` records ordered by `key_column`.
    async fn page_records(
        &self,
        table: &str,
        key_column: &str,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorageResult<Page>;

    /// Overwrite `fields` on the record whose `key_column` equals `key`.
    async fn update_record(
        &self,
        table: &str,
        key_column: &str,
        key: &Value,
        fields: &Record,
    ) -> StorageResult<()>;
}
