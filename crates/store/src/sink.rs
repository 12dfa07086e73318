use async_trait::async_trait;
use model::{BatchId, Coordinate, Event, SourceId};

use crate::error::StoreError;

/// The audit store's write surface. A `Sink` owns the two-phase
/// commit protocol and is the only component allowed to mutate the offset
/// record; everything upstream only ever appends events to a batch and
/// calls `commit` once it is full or a flush boundary is reached.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Loads the last committed coordinate for `source_id`, or `None` if
    /// this source has never committed anything.
    async fn load_offset(&self, source_id: &SourceId) -> Result<Option<Coordinate>, StoreError>;

    /// Commits one batch: stages it, atomically writes its events and the
    /// new offset, then best-effort marks the staging document committed.
    /// A failure here leaves the batch `pending` in staging, recoverable by
    /// `recover` on the next run.
    async fn commit(
        &self,
        batch_id: &BatchId,
        source_id: &SourceId,
        events: &[Event],
        coord: &Coordinate,
    ) -> Result<(), StoreError>;

    /// Reconciles staging on startup: every `pending` document for
    /// `source_id` is archived without replaying its events, since the
    /// reader resumes from the last *committed* offset and will regenerate
    /// any events the interrupted batch would have produced.
    async fn recover(&self, source_id: &SourceId) -> Result<(), StoreError>;
}
