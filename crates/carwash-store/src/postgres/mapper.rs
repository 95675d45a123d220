use carwash_core::{Record, Value};

use crate::error::{StorageError, StorageResult};

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    /// `users` resolves to `public.users`; `audit.events` keeps its schema.
    pub fn parse(table: &str) -> Self {
        match table.split_once('.') {
            Some((schema, name)) => Self {
                schema: schema.to_string(),
                name: name.to_string(),
            },
            None => Self {
                schema: "public".to_string(),
                name: table.to_string(),
            },
        }
    }

    /// Name as reported by `list_tables`.
    pub fn display_name(schema: &str, name: &str) -> String {
        if schema == "public" {
            name.to_string()
        } else {
            format!("{schema}.{name}")
        }
    }

    /// `display_name` of this table; `public.users` and `users` agree.
    pub fn canonical(&self) -> String {
        Self::display_name(&self.schema, &self.name)
    }

    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Decode one `to_jsonb(row)::text` result into a record.
pub fn record_from_json_text(text: &str) -> StorageResult<Record> {
    match serde_json::from_str::<serde_json::Value>(text)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(column, value)| (column, Value::from_json(value)))
            .collect()),
        other => Err(StorageError::Decode(format!(
            "expected a JSON object per row, got {other}"
        ))),
    }
}

/// Encode the fields of an update as a JSON object for `jsonb_populate_record`.
pub fn fields_to_json_text(fields: &Record) -> String {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(column, value)| (column.clone(), value.to_json()))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// Key values are bound as text and cast to the key column's type.
pub fn key_to_text(key: &Value) -> StorageResult<String> {
    match key {
        Value::Null => Err(StorageError::InvalidCursor(
            "primary key value is null".to_string(),
        )),
        other => Ok(other.to_string()),
    }
}
