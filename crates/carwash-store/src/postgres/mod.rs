use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;

use carwash_core::{Record, Value};

use crate::adapter::{Cursor, Page, Storage};
use crate::error::{StorageError, StorageResult};

mod mapper;
mod queries;

pub use mapper::{TableRef, quote_ident};
use queries::RawKey;

/// Store backed by a PostgreSQL pool.
///
/// Tables outside `public` are addressed as `schema.table`. Records are read
/// as `to_jsonb(row)` and written back through `jsonb_populate_record`, so
/// column types never need to be mapped on the Rust side.
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
    key_types: Mutex<HashMap<(String, String), String>>,
}

impl PostgresStore {
    /// Create a new store using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            key_types: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn key(&self, table: &TableRef, key_column: &str) -> StorageResult<RawKey> {
        let cache_key = (table.canonical(), key_column.to_string());
        if let Some(sql_type) = self
            .key_types
            .lock()
            .ok()
            .and_then(|cache| cache.get(&cache_key).cloned())
        {
            return Ok(RawKey {
                column: key_column.to_string(),
                sql_type,
            });
        }

        let sql_type = queries::column_type(&self.pool, table, key_column)
            .await?
            .ok_or_else(|| StorageError::UnknownColumn {
                table: cache_key.0.clone(),
                column: key_column.to_string(),
            })?;
        if let Ok(mut cache) = self.key_types.lock() {
            cache.insert(cache_key, sql_type.clone());
        }
        Ok(RawKey {
            column: key_column.to_string(),
            sql_type,
        })
    }
}

#[async_trait]
impl Storage for PostgresStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> StorageResult<Vec<String>> {
        queries::list_tables(&self.pool).await
    }

    async fn primary_key(&self, table: &str) -> StorageResult<String> {
        let table_ref = TableRef::parse(table);
        let mut keys = queries::primary_key(&self.pool, &table_ref).await?;
        if keys.len() != 1 {
            return Err(StorageError::NoPrimaryKey(table.to_string()));
        }
        let key = keys.remove(0);
        if let Ok(mut cache) = self.key_types.lock() {
            cache.insert((table_ref.canonical(), key.column.clone()), key.sql_type);
        }
        tracing::debug!(table = %table, key = %key.column, "primary key detected");
        Ok(key.column)
    }

    async fn page_records(
        &self,
        table: &str,
        key_column: &str,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorageResult<Page> {
        let table_ref = TableRef::parse(table);
        let key = self.key(&table_ref, key_column).await?;
        let after = match cursor {
            None => None,
            Some(Cursor::After(value)) => Some(value),
            Some(Cursor::Offset(_)) => {
                return Err(StorageError::InvalidCursor(
                    "postgres store pages by key, got offset cursor".to_string(),
                ));
            }
        };

        let records =
            queries::page_records(&self.pool, &table_ref, &key, page_size, after).await?;
        let next = if records.len() < page_size {
            None
        } else {
            records
                .last()
                .and_then(|record| record.get(key_column))
                .cloned()
                .map(Cursor::After)
        };
        Ok(Page { records, next })
    }

    async fn update_record(
        &self,
        table: &str,
        key_column: &str,
        key: &Value,
        fields: &Record,
    ) -> StorageResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let table_ref = TableRef::parse(table);
        let raw_key = self.key(&table_ref, key_column).await?;
        let affected = queries::update_record(&self.pool, &table_ref, &raw_key, key, fields).await?;
        if affected == 0 {
            return Err(StorageError::UnknownRecord {
                table: table.to_string(),
                key_column: key_column.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}
