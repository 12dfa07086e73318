use model::{SchemaRecord, SchemaTable};
use std::collections::HashMap;

/// The in-process `(schema, table) -> columns` cache. Its contents
/// are never trusted across a schema-change notification — the row
/// translator's bounds policy is what actually survives a stale or absent
/// entry, so this cache only needs to answer "do we have a hint" and to be
/// invalidated promptly.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: HashMap<SchemaTable, SchemaRecord>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &SchemaTable) -> Option<&SchemaRecord> {
        self.tables.get(table)
    }

    pub fn insert(&mut self, table: SchemaTable, record: SchemaRecord) {
        self.tables.insert(table, record);
    }

    /// Drops the cached entry for `table`, if any. Called on every
    /// `OnSchemaChanged` notification before further rows from that table
    /// are trusted.
    pub fn invalidate(&mut self, table: &SchemaTable) {
        self.tables.remove(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = SchemaCache::new();
        let table = SchemaTable::new("db", "t");
        cache.insert(table.clone(), SchemaRecord::new(vec!["id".into()], vec!["id".into()]));
        assert!(cache.get(&table).is_some());

        cache.invalidate(&table);
        assert!(cache.get(&table).is_none());
    }

    #[test]
    fn missing_entry_returns_none() {
        let cache = SchemaCache::new();
        assert!(cache.get(&SchemaTable::new("db", "t")).is_none());
    }
}
