use crate::core::Value;
use serde::{Deserialize, Serialize};

/// The action a row event represents, matching the source replication log's
/// vocabulary (insert/update/delete), abbreviated in documents as i/u/d.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "i")]
    Insert,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "d")]
    Delete,
}

impl Op {
    pub fn as_code(&self) -> &'static str {
        match self {
            Op::Insert => "i",
            Op::Update => "u",
            Op::Delete => "d",
        }
    }
}

/// One row, as the source presents it: a flat, index-addressed list of
/// column values. May be shorter than the declared column count when the
/// source omits virtual/generated columns from the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow(pub Vec<Value>);

impl RawRow {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }
}

/// A single committed row mutation, as delivered by the replication-log
/// reader's `OnRow` callback, before translation into an audit `Event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRowEvent {
    pub schema: String,
    pub table: String,
    pub op: Op,
    /// Present for update/delete: the row image before the mutation.
    pub before: Option<RawRow>,
    /// Present for insert/update: the row image after the mutation.
    pub after: Option<RawRow>,
    pub event_time: chrono::DateTime<chrono::Utc>,
}
