use thiserror::Error;

/// Top-level errors the lifecycle supervisor can surface. A `FatalConfig`
/// is never represented here — it is detected before the supervisor is
/// even constructed and aborts startup directly.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Handler(#[from] engine_core::HandlerError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Source(#[from] connectors::SourceError),

    #[error("reader task panicked or was cancelled: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
