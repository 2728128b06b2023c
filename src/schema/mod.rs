// src/schema/mod.rs
//! Declarative column schemas for the five dataset exports.
//!
//! Each dataset is described by a [`TableSchema`]: the key column, a
//! minimum column count, and an ordered `{index, name}` column list
//! consumed by one generic extraction routine. The built-in defaults
//! mirror the deployed export layouts; a deployment whose exports drift
//! can override them from a YAML file instead of recompiling.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::parse::clean_field;

/// One extracted column: its 0-based position in the source line and
/// the name the rest of the pipeline uses to address it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub index: usize,
    pub name: String,
}

/// Fixed-position layout of one dataset export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Source file name, resolved against the data base at load time.
    pub file: String,
    pub key_column: usize,
    /// Uppercase the key before indexing (site codes are case-insensitive).
    #[serde(default)]
    pub uppercase_key: bool,
    /// Lines with fewer fields are skipped without error.
    pub min_columns: usize,
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    fn new(
        file: &str,
        key_column: usize,
        uppercase_key: bool,
        min_columns: usize,
        columns: &[(usize, &str)],
    ) -> Self {
        TableSchema {
            file: file.to_string(),
            key_column,
            uppercase_key,
            min_columns,
            columns: columns
                .iter()
                .map(|(index, name)| ColumnSpec {
                    index: *index,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Apply the schema to one split line.
    ///
    /// Returns the cleaned key and the extracted values, or `None` when
    /// the line is under-width or its key cleans down to nothing.
    pub fn extract(&self, fields: &[String]) -> Option<(String, Row)> {
        if fields.len() < self.min_columns {
            return None;
        }
        let mut key = clean_field(&fields[self.key_column]);
        if self.uppercase_key {
            key = key.to_uppercase();
        }
        if key.is_empty() {
            return None;
        }
        let values = self
            .columns
            .iter()
            .map(|c| clean_field(fields.get(c.index).map(String::as_str).unwrap_or("")))
            .collect();
        Some((key, Row { values }))
    }

    /// Offset of the named column within extracted rows.
    pub fn column_offset(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// One extracted record; values run parallel to the schema's column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value at an extraction offset, empty when out of range.
    pub fn value(&self, offset: usize) -> &str {
        self.values.get(offset).map(String::as_str).unwrap_or("")
    }

    /// Value of the named column under `schema`, empty when the schema
    /// does not carry that column.
    pub fn get<'a>(&'a self, schema: &TableSchema, name: &str) -> &'a str {
        schema
            .column_offset(name)
            .map(|offset| self.value(offset))
            .unwrap_or("")
    }
}

/// The five dataset schemas plus report-level knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSet {
    pub sites: TableSchema,
    pub lncel: TableSchema,
    pub config_2g: TableSchema,
    pub ant_4g: TableSchema,
    pub opt_speed: TableSchema,
    /// Which 2G column carries the admin state. Deployed exports
    /// disagree on its position, so it is configuration, not code.
    pub admin_state_column: String,
}

impl Default for SchemaSet {
    fn default() -> Self {
        // Column letters follow the spreadsheet exports this tool reads.
        SchemaSet {
            sites: TableSchema::new("sites.csv", 7, true, 19, &[(18, "ip")]),
            lncel: TableSchema::new(
                "LNCEL_KR_RO.csv",
                1,
                true,
                27,
                &[
                    (7, "h"),
                    (9, "j"),
                    (20, "u"),
                    (21, "v"),
                    (22, "w"),
                    (23, "x"),
                    (26, "aa"),
                ],
            ),
            config_2g: TableSchema::new(
                "Config_2G.csv",
                3,
                true,
                16,
                &[
                    (4, "e"),
                    (6, "g"),
                    (7, "h"),
                    (8, "i"),
                    (9, "j"),
                    (10, "k"),
                    (11, "l"),
                    (14, "o"),
                    (15, "p"),
                    (13, "n"),
                ],
            ),
            ant_4g: TableSchema::new(
                "4G_ANT.csv",
                1,
                false,
                5,
                &[(0, "a"), (2, "c"), (3, "d"), (4, "e")],
            ),
            opt_speed: TableSchema::new("OPT_Speed.csv", 25, false, 26, &[(12, "m"), (7, "h")]),
            admin_state_column: "h".to_string(),
        }
    }
}

impl SchemaSet {
    /// Load schema overrides from a YAML file, falling back to the
    /// built-in layouts when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(SchemaSet::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading schema file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing schema file {}", path.display()))
    }
}
