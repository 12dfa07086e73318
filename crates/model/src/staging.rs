use crate::{core::BatchId, core::SourceId, event::Event, position::Coordinate};
use serde::{Deserialize, Serialize};

/// A staging document's lifecycle. Transitions only flow pending->committed
/// or pending->archived; a committed batch is never later archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Committed,
    Archived,
}

/// The durable recovery witness for one in-flight batch. Participates in no
/// query path; Recovery is its only reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingBatch {
    pub batch_id: BatchId,
    pub source_id: SourceId,
    pub events: Vec<Event>,
    pub coord: Coordinate,
    pub status: BatchStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub committed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub archived_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl StagingBatch {
    pub fn new(
        batch_id: BatchId,
        source_id: SourceId,
        events: Vec<Event>,
        coord: Coordinate,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            batch_id,
            source_id,
            events,
            coord,
            status: BatchStatus::Pending,
            created_at,
            committed_at: None,
            archived_at: None,
        }
    }
}
