use model::SchemaTable;
use regex::Regex;

/// The table filter derived from `INCLUDE_REGEX`/`EXCLUDE_REGEX`.
/// Matching is against the `schema.table` form; exclude wins over include
/// when both match the same table.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl TableFilter {
    pub fn new(include: Option<Regex>, exclude: Option<Regex>) -> Self {
        Self { include, exclude }
    }

    pub fn allows(&self, table: &SchemaTable) -> bool {
        let qualified = table.to_string();

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(&qualified) {
                return false;
            }
        }

        match &self.include {
            Some(include) => include.is_match(&qualified),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_everything_with_no_patterns() {
        let filter = TableFilter::default();
        assert!(filter.allows(&SchemaTable::new("db", "t")));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = TableFilter::new(Some(Regex::new(".*").unwrap()), Some(Regex::new("^db\\.secrets$").unwrap()));
        assert!(!filter.allows(&SchemaTable::new("db", "secrets")));
        assert!(filter.allows(&SchemaTable::new("db", "orders")));
    }

    #[test]
    fn include_restricts_to_matching_tables() {
        let filter = TableFilter::new(Some(Regex::new("^db\\.orders$").unwrap()), None);
        assert!(filter.allows(&SchemaTable::new("db", "orders")));
        assert!(!filter.allows(&SchemaTable::new("db", "users")));
    }
}
