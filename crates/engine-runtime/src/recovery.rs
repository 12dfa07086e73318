use model::SourceId;
use store::{Sink, StoreError};
use tracing::info;

/// Reconciles `staging` before the reader is attached. A thin
/// orchestration layer over `Sink::recover`, which owns the actual
/// archive-without-replay protocol; this just logs the boundary and
/// propagates failure, since recovery must run to completion before
/// startup continues.
pub async fn run(sink: &dyn Sink, source_id: &SourceId) -> Result<(), StoreError> {
    info!(source_id = %source_id, "starting recovery");
    sink.recover(source_id).await?;
    info!(source_id = %source_id, "recovery complete");
    Ok(())
}
