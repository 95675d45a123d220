use sqlx::PgPool;

use carwash_core::{Record, Value};

use super::mapper::{TableRef, fields_to_json_text, key_to_text, quote_ident, record_from_json_text};
use crate::error::{StorageError, StorageResult};

pub async fn list_tables(pool: &PgPool) -> StorageResult<Vec<String>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        select table_schema::text, table_name::text
        from information_schema.tables
        where table_type = 'BASE TABLE'
          and table_schema not in ('pg_catalog', 'information_schema')
          and table_schema not like 'pg_toast%'
        order by table_schema, table_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(schema, name)| TableRef::display_name(&schema, &name))
        .collect())
}

/// Key column name and its SQL type, for single-column primary keys.
pub struct RawKey {
    pub column: String,
    pub sql_type: String,
}

pub async fn primary_key(pool: &PgPool, table: &TableRef) -> StorageResult<Vec<RawKey>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        select a.attname::text, format_type(a.atttypid, a.atttypmod)
        from pg_index i
        join pg_class c on c.oid = i.indrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_attribute a on a.attrelid = c.oid and a.attnum = any(i.indkey)
        where i.indisprimary
          and n.nspname = $1
          and c.relname = $2
        order by a.attnum
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(column, sql_type)| RawKey { column, sql_type })
        .collect())
}

pub async fn column_type(
    pool: &PgPool,
    table: &TableRef,
    column: &str,
) -> StorageResult<Option<String>> {
    let sql_type = sqlx::query_scalar::<_, String>(
        r#"
        select format_type(a.atttypid, a.atttypmod)
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relname = $2
          and a.attname = $3
          and a.attnum > 0
          and not a.attisdropped
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .bind(column)
    .fetch_optional(pool)
    .await?;

    Ok(sql_type)
}

/// Keyset page: rows with a key greater than `after`, in key order.
pub async fn page_records(
    pool: &PgPool,
    table: &TableRef,
    key: &RawKey,
    page_size: usize,
    after: Option<&Value>,
) -> StorageResult<Vec<Record>> {
    let key_column = quote_ident(&key.column);
    let limit = i64::try_from(page_size).unwrap_or(i64::MAX);

    let rows = match after {
        Some(after) => {
            let sql = format!(
                "select to_jsonb(t)::text from {} t \
                 where t.{key_column} > $1::{} \
                 order by t.{key_column} limit $2",
                table.quoted(),
                key.sql_type
            );
            sqlx::query_scalar::<_, String>(&sql)
                .bind(key_to_text(after)?)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "select to_jsonb(t)::text from {} t order by t.{key_column} limit $1",
                table.quoted()
            );
            sqlx::query_scalar::<_, String>(&sql)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(|row| record_from_json_text(row)).collect()
}

/// Overwrite `fields` through `jsonb_populate_record` so Postgres coerces
/// each JSON value to its column type.
pub async fn update_record(
    pool: &PgPool,
    table: &TableRef,
    key: &RawKey,
    key_value: &Value,
    fields: &Record,
) -> StorageResult<u64> {
    let columns = fields
        .keys()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let table_name = table.quoted();
    let sql = format!(
        "update {table_name} set ({columns}) = \
         (select {columns} from jsonb_populate_record(null::{table_name}, $1::jsonb)) \
         where {} = $2::{}",
        quote_ident(&key.column),
        key.sql_type
    );

    let result = sqlx::query(&sql)
        .bind(fields_to_json_text(fields))
        .bind(key_to_text(key_value)?)
        .execute(pool)
        .await
        .map_err(|err| classify_update_error(err, table))?;

    Ok(result.rows_affected())
}

fn classify_update_error(err: sqlx::Error, table: &TableRef) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("42703")
    {
        return StorageError::UnknownColumn {
            table: TableRef::display_name(&table.schema, &table.name),
            column: db_err.message().to_string(),
        };
    }
    StorageError::from(err)
}
