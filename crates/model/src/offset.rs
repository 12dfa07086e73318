use crate::{core::SourceId, position::Coordinate};
use serde::{Deserialize, Serialize};

/// The single durable record of how far a source has been committed.
/// Exactly one per source id; updated only inside a commit transaction (or
/// its documented non-atomic fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetRecord {
    pub source_id: SourceId,
    pub coord: Coordinate,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl OffsetRecord {
    pub fn new(source_id: SourceId, coord: Coordinate, updated_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            source_id,
            coord,
            updated_at,
        }
    }
}
