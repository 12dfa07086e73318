use serde::{Deserialize, Serialize};

/// Identifies a table within a schema/database; the key of the in-process
/// schema cache and the unit `OnSchemaChanged` invalidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaTable {
    pub schema: String,
    pub table: String,
}

impl SchemaTable {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// The column list and primary-key columns the cache holds for one table.
/// Its contents are never trusted across a schema-change notification; the
/// bounds policy in the row translator is what actually survives a stale
/// or missing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
}

impl SchemaRecord {
    pub fn new(columns: Vec<String>, primary_key: Vec<String>) -> Self {
        Self {
            columns,
            primary_key,
        }
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}
