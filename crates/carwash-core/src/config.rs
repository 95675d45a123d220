//! On-disk configuration model.
//!
//! A config file maps table names to either a whole-record formatter or a
//! block of field formatters. Parsing only validates structure; turning the
//! entries into formatter specs happens in the scrub crate.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::value::Arg;

/// Root of a `carwash` configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Config contract version (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Table name to scrub rule.
    #[serde(default)]
    pub tables: BTreeMap<String, RawTableEntry>,
}

/// Scrub rule for one table.
///
/// Only a bare string is shorthand for a whole-record formatter. Any table
/// written as a map is a block, so a column named `type` or `generator` is
/// a field like every other.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawTableEntry {
    /// `"app::ScrubSession"`
    Shorthand(String),
    /// Block with reserved keys plus field formatters.
    Block(TableBlock),
}

/// Table block. Keys other than the reserved ones are field formatters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableBlock {
    /// Primary-key column; looked up in storage when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Whole-record formatter. Exclusive with field formatters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RawFormatter>,
    /// Explicit field map, for columns named like a reserved key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, RawFormatter>,
    #[serde(flatten)]
    pub inline: BTreeMap<String, RawFormatter>,
}

/// Formatter as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawFormatter {
    /// `"firstName"`, `"words:3,true"` or a type name such as `"carwash::Redact"`.
    Spec(String),
    /// `{ generator = "password", args = [12, 16] }`
    Generator(GeneratorEntry),
    /// `{ type = "carwash::Sha256" }`
    Type(TypeEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GeneratorEntry {
    pub generator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ConfigFile {
    pub fn from_json_str(input: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl TableBlock {
    /// Field formatters from both the `fields` map and inline keys.
    pub fn field_entries(&self, table: &str) -> ConfigResult<BTreeMap<String, RawFormatter>> {
        let mut merged = self.fields.clone();
        for (field, formatter) in &self.inline {
            if merged.insert(field.clone(), formatter.clone()).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "field '{table}.{field}' is configured twice"
                )));
            }
        }
        Ok(merged)
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty() || !self.inline.is_empty()
    }
}

/// JSON Schema describing the configuration file.
pub fn config_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ConfigFile)
}
