//! In-process store used by tests and by embedders scrubbing fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use carwash_core::{Record, Value};

use crate::adapter::{Cursor, Page, Storage};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
struct MemoryTable {
    key_column: String,
    columns: BTreeSet<String>,
    records: Vec<Record>,
}

/// Tables of records kept in insertion order.
///
/// Columns are fixed by the records a table is created with; updates naming
/// any other column are rejected, as a database would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace `table` with the given records.
    pub fn insert_table(
        &self,
        table: impl Into<String>,
        key_column: impl Into<String>,
        records: Vec<Record>,
    ) -> StorageResult<()> {
        let key_column = key_column.into();
        let mut columns: BTreeSet<String> = records
            .iter()
            .flat_map(|record| record.keys().cloned())
            .collect();
        columns.insert(key_column.clone());
        self.lock()?.insert(
            table.into(),
            MemoryTable {
                key_column,
                columns,
                records,
            },
        );
        Ok(())
    }

    /// Snapshot of every record in `table`.
    pub fn records(&self, table: &str) -> Option<Vec<Record>> {
        let tables = self.lock().ok()?;
        tables.get(table).map(|table| table.records.clone())
    }

    /// Record of `table` whose key equals `key`.
    pub fn find(&self, table: &str, key: &Value) -> Option<Record> {
        let tables = self.lock().ok()?;
        let table = tables.get(table)?;
        table
            .records
            .iter()
            .find(|record| record.get(&table.key_column) == Some(key))
            .cloned()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, MemoryTable>>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn primary_key(&self, table: &str) -> StorageResult<String> {
        let tables = self.lock()?;
        tables
            .get(table)
            .map(|table| table.key_column.clone())
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))
    }

    async fn page_records(
        &self,
        table: &str,
        _key_column: &str,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorageResult<Page> {
        let tables = self.lock()?;
        let data = tables
            .get(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        let offset = match cursor {
            None => 0,
            Some(Cursor::Offset(offset)) => *offset,
            Some(Cursor::After(value)) => {
                return Err(StorageError::InvalidCursor(format!(
                    "memory store pages by offset, got key cursor {value}"
                )));
            }
        };

        let records: Vec<Record> = data
            .records
            .iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect();
        let consumed = offset + records.len();
        let next = (consumed < data.records.len()).then_some(Cursor::Offset(consumed));
        Ok(Page { records, next })
    }

    async fn update_record(
        &self,
        table: &str,
        key_column: &str,
        key: &Value,
        fields: &Record,
    ) -> StorageResult<()> {
        let mut tables = self.lock()?;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        if let Some(column) = fields.keys().find(|column| !data.columns.contains(*column)) {
            return Err(StorageError::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }

        let record = data
            .records
            .iter_mut()
            .find(|record| record.get(key_column) == Some(key))
            .ok_or_else(|| StorageError::UnknownRecord {
                table: table.to_string(),
                key_column: key_column.to_string(),
                key: key.to_string(),
            })?;
        for (column, value) in fields {
            record.insert(column.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str) -> Record {
        [
            ("id".to_string(), Value::Int(id)),
            ("name".to_string(), Value::from(name)),
        ]
        .into_iter()
        .collect()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_table(
                "users",
                "id",
                vec![record(1, "a"), record(2, "b"), record(3, "c")],
            )
            .expect("insert table");
        store
    }

    #[tokio::test]
    async fn pages_by_offset_until_exhausted() {
        let store = store();
        let first = store
            .page_records("users", "id", 2, None)
            .await
            .expect("first page");
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.next, Some(Cursor::Offset(2)));

        let second = store
            .page_records("users", "id", 2, first.next.as_ref())
            .await
            .expect("second page");
        assert_eq!(second.records, vec![record(3, "c")]);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn exact_multiple_ends_without_empty_page() {
        let store = store();
        let page = store
            .page_records("users", "id", 3, None)
            .await
            .expect("page");
        assert_eq!(page.records.len(), 3);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn update_rejects_unknown_columns_and_records() {
        let store = store();
        let fields: Record = [("nickname".to_string(), Value::from("x"))]
            .into_iter()
            .collect();
        let err = store
            .update_record("users", "id", &Value::Int(1), &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownColumn { .. }));

        let fields: Record = [("name".to_string(), Value::from("x"))].into_iter().collect();
        let err = store
            .update_record("users", "id", &Value::Int(99), &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownRecord { .. }));

        store
            .update_record("users", "id", &Value::Int(2), &fields)
            .await
            .expect("update existing record");
        assert_eq!(store.find("users", &Value::Int(2)), Some(record(2, "x")));
    }
}
