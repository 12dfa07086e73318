use thiserror::Error;

/// The Handler's own failures, on top of whatever the sink or source
/// surface. Every variant here is something the batcher/handler can
/// actually cause; store and reader errors are wrapped, not duplicated.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] store::StoreError),

    /// The in-memory batch was non-empty but carried no coordinate, which
    /// cannot happen if every appended event updates it — surfaced rather
    /// than silently committing with a stale coordinate.
    #[error("batch has events but no tracked coordinate")]
    MissingCoordinate,
}
