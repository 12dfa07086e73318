use model::{ColumnChange, Op, RawRow, RawRowEvent, SchemaRecord};
use std::collections::BTreeMap;

/// A row event translated into the pieces an `Event` is built from, short
/// of the coordinate and id (those are the handler's job; this module is
/// pure and needs no sink or position state).
pub struct TranslatedRow {
    pub pk: String,
    pub changes: BTreeMap<String, ColumnChange>,
}

/// Translates one row event against the cache's current (possibly absent
/// or stale) schema record. Returns `None` only when the table has
/// no known primary key — the one case the handler must skip and warn
/// about once.
pub fn translate(event: &RawRowEvent, schema: Option<&SchemaRecord>) -> Option<TranslatedRow> {
    let schema = schema?;
    if !schema.has_primary_key() {
        return None;
    }

    let pk_row = event.after.as_ref().or(event.before.as_ref())?;
    let pk = primary_key(schema, pk_row)?;
    let changes = build_changes(event.op, event.before.as_ref(), event.after.as_ref(), &schema.columns);

    Some(TranslatedRow { pk, changes })
}

fn primary_key(schema: &SchemaRecord, row: &RawRow) -> Option<String> {
    let mut parts = Vec::with_capacity(schema.primary_key.len());
    for pk_col in &schema.primary_key {
        let idx = schema.columns.iter().position(|c| c == pk_col)?;
        let value = row.get(idx)?;
        parts.push(value.to_string());
    }
    Some(parts.join("|"))
}

/// Builds the before/after change map, iterating only to
/// `min(len(columns), len(row))` so virtual columns the log omits and
/// schema drift between a notification and the next event never panic or
/// corrupt the map.
fn build_changes(
    op: Op,
    before: Option<&RawRow>,
    after: Option<&RawRow>,
    columns: &[String],
) -> BTreeMap<String, ColumnChange> {
    let mut changes = BTreeMap::new();

    match op {
        Op::Insert => {
            let Some(after) = after else { return changes };
            let bound = columns.len().min(after.len());
            for idx in 0..bound {
                changes.insert(columns[idx].clone(), ColumnChange { from: None, to: after.get(idx).cloned() });
            }
        }
        Op::Delete => {
            let Some(before) = before else { return changes };
            let bound = columns.len().min(before.len());
            for idx in 0..bound {
                changes.insert(columns[idx].clone(), ColumnChange { from: before.get(idx).cloned(), to: None });
            }
        }
        Op::Update => {
            let (Some(before), Some(after)) = (before, after) else { return changes };
            let bound = columns.len().min(before.len()).min(after.len());
            for idx in 0..bound {
                let from = before.get(idx).cloned();
                let to = after.get(idx).cloned();
                let differs = match (&from, &to) {
                    (Some(a), Some(b)) => !a.deep_eq(b),
                    (None, None) => false,
                    _ => true,
                };
                if differs {
                    changes.insert(columns[idx].clone(), ColumnChange { from, to });
                }
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Value;

    fn schema() -> SchemaRecord {
        SchemaRecord::new(vec!["id".into(), "v".into()], vec!["id".into()])
    }

    fn event(op: Op, before: Option<Vec<Value>>, after: Option<Vec<Value>>) -> RawRowEvent {
        RawRowEvent {
            schema: "db".into(),
            table: "t".into(),
            op,
            before: before.map(RawRow),
            after: after.map(RawRow),
            event_time: chrono::Utc::now(),
        }
    }

    #[test]
    fn insert_has_no_from_values() {
        let ev = event(Op::Insert, None, Some(vec![Value::Int(1), Value::String("a".into())]));
        let row = translate(&ev, Some(&schema())).unwrap();
        assert_eq!(row.pk, "1");
        assert_eq!(row.changes.len(), 2);
        assert!(row.changes["id"].from.is_none());
        assert!(row.changes["v"].from.is_none());
    }

    #[test]
    fn delete_has_no_to_values() {
        let ev = event(Op::Delete, Some(vec![Value::Int(1), Value::String("a".into())]), None);
        let row = translate(&ev, Some(&schema())).unwrap();
        assert_eq!(row.pk, "1");
        assert!(row.changes["v"].to.is_none());
    }

    #[test]
    fn update_only_emits_changed_columns() {
        let ev = event(
            Op::Update,
            Some(vec![Value::Int(1), Value::String("a".into())]),
            Some(vec![Value::Int(1), Value::String("b".into())]),
        );
        let row = translate(&ev, Some(&schema())).unwrap();
        assert_eq!(row.changes.len(), 1);
        assert_eq!(row.changes["v"].from, Some(Value::String("a".into())));
        assert_eq!(row.changes["v"].to, Some(Value::String("b".into())));
    }

    #[test]
    fn missing_schema_skips_row() {
        let ev = event(Op::Insert, None, Some(vec![Value::Int(1)]));
        assert!(translate(&ev, None).is_none());
    }

    #[test]
    fn schema_without_primary_key_skips_row() {
        let ev = event(Op::Insert, None, Some(vec![Value::Int(1)]));
        let schema = SchemaRecord::new(vec!["id".into()], vec![]);
        assert!(translate(&ev, Some(&schema)).is_none());
    }

    #[test]
    fn short_row_is_translated_up_to_its_own_length() {
        // A generated column not carried in the log: only one value present
        // where the schema declares two.
        let ev = event(Op::Insert, None, Some(vec![Value::Int(1)]));
        let row = translate(&ev, Some(&schema())).unwrap();
        assert_eq!(row.changes.len(), 1);
        assert!(row.changes.contains_key("id"));
    }
}
