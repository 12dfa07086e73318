use crate::error::SourceError;
use async_trait::async_trait;
use model::{PositionToken, RawRowEvent, SchemaTable};
use std::fmt;

/// An opaque failure from a `RowSink` callback (a commit, typically).
/// Boxed so the reader doesn't need to know the handler's concrete error
/// type; the reader's `run` wraps it in `SourceError::Sink` and returns,
/// which is the documented "halt on persistence failure" policy.
#[derive(Debug)]
pub struct SinkFailure(pub Box<dyn std::error::Error + Send + Sync>);

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SinkFailure {}

impl<E> From<E> for SinkFailure
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        SinkFailure(Box::new(err))
    }
}

/// The subscription contract the replication-log reader drives. A
/// single implementation, the pipeline's Handler, satisfies it; callbacks
/// are delivered sequentially on one logical worker — there is no
/// concurrent mutation of whatever state the sink keeps. Every callback
/// can fail: a commit error must reach the reader so it can stop pulling
/// from the source rather than grow an unbounded backlog.
#[async_trait]
pub trait RowSink: Send {
    /// A committed row mutation.
    async fn on_row(&mut self, event: RawRowEvent) -> Result<(), SinkFailure>;

    /// The reader has processed up to `file`/`offset`/`token`. `forced` is
    /// set when the notification was not tied to a row event (a periodic
    /// heartbeat the reader emits to keep the position moving during long
    /// idle stretches).
    async fn on_position_synced(
        &mut self,
        file: &str,
        offset: u64,
        token: &PositionToken,
        forced: bool,
    ) -> Result<(), SinkFailure>;

    /// The reader has moved to a new physical log file.
    async fn on_rotate(&mut self, next_file: &str, start_offset: u64) -> Result<(), SinkFailure>;

    /// The named table's schema changed; its cache entry must be
    /// invalidated before further rows from that table are trusted. This
    /// also flushes the current batch, so it can fail the same way
    /// a commit can.
    async fn on_schema_changed(&mut self, schema: &str, table: &str) -> Result<(), SinkFailure>;

    /// A new opaque position token is observed, emitted before the row
    /// events that belong to it.
    async fn on_position_token(&mut self, token: &PositionToken) -> Result<(), SinkFailure>;

    /// The reader has resolved (or re-resolved, after an `on_schema_changed`
    /// invalidation) a table's column list and primary key, typically by
    /// querying the source's catalog the first time a table map for that
    /// table is seen. This is what actually populates the schema cache;
    /// `on_schema_changed` only clears it.
    async fn on_table_schema(
        &mut self,
        table: SchemaTable,
        columns: Vec<String>,
        primary_key: Vec<String>,
    ) -> Result<(), SinkFailure>;
}

/// Where the reader should begin streaming from at startup.
#[derive(Debug, Clone)]
pub enum StartPosition {
    /// Resume from a previously committed position token.
    Token(PositionToken),
    /// No offset was recorded; ask the source for its current position and
    /// start from there (documented cold-start behavior, logged at WARN by
    /// the caller).
    SourceCurrent,
}

/// The replication-log reader's connection parameters. Reconnection,
/// binary-log parsing, and GTID bookkeeping live entirely inside the
/// driver this wraps — out of scope for this pipeline.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    pub addr: String,
    pub user: String,
    pub pass: String,
    pub flavor: String,
    pub client_id: u32,
}

/// Drives a `RowSink` from the source's replication log until cancelled or
/// until a terminal `SourceError` occurs. `run` does not return on success;
/// it returns only on cancellation or unrecoverable failure.
#[async_trait]
pub trait ReplicationReader: Send {
    async fn run(
        &mut self,
        start: StartPosition,
        sink: &mut dyn RowSink,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<(), SourceError>;

    /// The source's current position token, used for cold starts.
    async fn current_position(&mut self) -> Result<PositionToken, SourceError>;
}
