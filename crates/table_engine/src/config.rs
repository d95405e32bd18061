//! Table editor configuration
//!
//! The form layer hands the editor a JSON options object; the table editor
//! reads its own settings from it. Every field is optional.

use crate::Result;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

/// Table editor settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TableConfig {
    /// Largest row count `insert_table` accepts
    pub max_rows: usize,
    /// Largest column count `insert_table` accepts
    pub max_cols: usize,
    /// Rows shown by the dimension picker
    pub picker_rows: usize,
    /// Columns shown by the dimension picker
    pub picker_cols: usize,
    /// Whether Tab in the last cell appends a row
    pub tab_inserts_row: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_rows: 20,
            max_cols: 20,
            picker_rows: 8,
            picker_cols: 8,
            tab_inserts_row: true,
        }
    }
}

impl TableConfig {
    /// Parse settings from a JSON options object
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("table settings must be a JSON object").into());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parse settings from JSON, falling back to defaults when it is invalid
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse table settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Whether `rows × cols` is a size `insert_table` accepts
    pub fn accepts_dimensions(&self, rows: usize, cols: usize) -> bool {
        (1..=self.max_rows).contains(&rows) && (1..=self.max_cols).contains(&cols)
    }
}
