use crate::{core::Value, position::Coordinate, row::Op};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The stable, deterministic id of an `Event`: a fixed-width hash of
/// (schema, table, pk, event-time, op, file, offset, position-token).
/// Two attempts at committing the same row mutation always produce the
/// same id, so the audit store's uniqueness constraint can absorb replays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        schema: &str,
        table: &str,
        pk: &str,
        event_time: chrono::DateTime<chrono::Utc>,
        op: Op,
        coord: &Coordinate,
    ) -> Self {
        let mut hasher = Sha256::new();
        // A delimiter that cannot appear inside any single component keeps
        // the tuple's byte encoding unambiguous (no accidental collisions
        // from field-ordering or concatenation boundary shifts).
        const SEP: u8 = 0x1f;
        for part in [
            schema.as_bytes(),
            table.as_bytes(),
            pk.as_bytes(),
            event_time.to_rfc3339().as_bytes(),
            op.as_code().as_bytes(),
            coord.file_offset.file.as_bytes(),
            coord.file_offset.offset.to_string().as_bytes(),
            coord.token.as_str().as_bytes(),
        ] {
            hasher.update(part);
            hasher.update([SEP]);
        }
        Self(hex::encode(hasher.finalize()))
    }
}

/// The before/after pair for one column touched by a mutation. Field names
/// match the audit store's stable document shape: `f`/`t` rather than
/// `from`/`to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnChange {
    #[serde(rename = "f")]
    pub from: Option<Value>,
    #[serde(rename = "t")]
    pub to: Option<Value>,
}

/// `meta` sub-document: the table and primary key a mutation belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMeta {
    pub db: String,
    pub tbl: String,
    pub pk: String,
}

/// `src.binlog` sub-document: the physical file+offset companion to the
/// opaque position token carried alongside it as `src.gtid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinlogPosition {
    pub file: String,
    pub pos: u64,
}

/// `src` sub-document: the full source coordinate, re-expressed from
/// `Coordinate` in the event document's stable field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    pub binlog: BinlogPosition,
    pub gtid: String,
}

impl From<&Coordinate> for EventSource {
    fn from(coord: &Coordinate) -> Self {
        Self {
            binlog: BinlogPosition { file: coord.file_offset.file.clone(), pos: coord.file_offset.offset },
            gtid: coord.token.as_str().to_string(),
        }
    }
}

/// An immutable audit document: one committed row mutation, addressed by
/// its deterministic id so replays of the same source coordinate collapse
/// onto the same document. The shape below (`meta`/`chg`/`src`) is a bit-exact
/// external contract; it must not be flattened or renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub op: Op,
    pub meta: EventMeta,
    /// Ordered so the same logical change always serializes identically.
    pub chg: BTreeMap<String, ColumnChange>,
    pub src: EventSource,
    pub ts_display: Option<String>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: String,
        table: String,
        pk: String,
        op: Op,
        event_time: chrono::DateTime<chrono::Utc>,
        changes: BTreeMap<String, ColumnChange>,
        coord: Coordinate,
        ts_display: Option<String>,
    ) -> Self {
        let id = EventId::compute(&schema, &table, &pk, event_time, op, &coord);
        let src = EventSource::from(&coord);
        Self {
            id,
            ts: event_time,
            op,
            meta: EventMeta { db: schema, tbl: table, pk },
            chg: changes,
            src,
            ts_display,
        }
    }
}

// A tiny, local hex encoder avoids pulling in the `hex` crate for 32 bytes.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            write!(&mut out, "{b:02x}").expect("writing to a String cannot fail");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionToken;
    use chrono::TimeZone;

    fn coord() -> Coordinate {
        Coordinate::new(PositionToken::new("gtid:1-5"), "binlog.000001", 100)
    }

    #[test]
    fn same_input_produces_same_id() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = EventId::compute("db", "t", "1", ts, Op::Insert, &coord());
        let b = EventId::compute("db", "t", "1", ts, Op::Insert, &coord());
        assert_eq!(a, b);
    }

    #[test]
    fn differing_input_produces_differing_id() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = EventId::compute("db", "t", "1", ts, Op::Insert, &coord());
        let b = EventId::compute("db", "t", "2", ts, Op::Insert, &coord());
        assert_ne!(a, b);
    }

    #[test]
    fn id_is_stable_width_hex() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let id = EventId::compute("db", "t", "1", ts, Op::Update, &coord());
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
