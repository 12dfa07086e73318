use thiserror::Error;

/// Errors surfaced by the replication-log reader. The reader's own
/// reconnection policy absorbs most transport hiccups internally; what
/// reaches the handler is either a resumable gap or a terminal failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mysql driver error: {0}")]
    Driver(#[from] mysql_async::Error),

    /// The requested resume position no longer exists in the source log;
    /// current policy is to fall back to the source's current position
    /// with a WARN, a documented partial-coverage case that depends on
    /// operator-configured retention.
    #[error("resume position {0} has been purged from the source log")]
    Truncated(String),

    /// The reader cannot read further and its own reconnection policy has
    /// given up.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid source configuration: {0}")]
    Config(String),

    /// A `RowSink` callback failed (typically a commit). The reader halts
    /// rather than keep pulling from the source while unable to persist
    /// what it reads.
    #[error("sink callback failed: {0}")]
    Sink(String),
}
