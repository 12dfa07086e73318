use thiserror::Error;

/// The behavioral error classes the audit store can surface. These are
/// not 1:1 with any particular driver exception; `classify` below maps the
/// store's actual error vocabulary onto them in one place.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Write-concern timeouts, leader-unavailable, and similar — retryable
    /// by the harness.
    #[error("transient store error: {0}")]
    Transient(String),

    /// A write collision on the event id. Not an error: every such id was
    /// already written by an earlier attempt of the same batch.
    #[error("duplicate event id")]
    DuplicateId,

    /// Retries exhausted; the enclosing commit fails and the batch remains
    /// `pending` in staging for the next run's recovery.
    #[error("store unavailable after exhausting retries: {0}")]
    Unavailable(String),

    /// The deployment lacks the topology multi-document transactions
    /// require; triggers the non-atomic fallback.
    #[error("store does not support transactions: {0}")]
    NoTransactionSupport(String),

    /// Any other store failure, considered terminal by the retry harness.
    #[error("store error: {0}")]
    Other(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        classify(&err)
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Other(err.to_string())
    }
}

/// Centralizes the mapping from the store's actual error vocabulary to the
/// behavioral classes above; exact driver error codes should only ever be
/// matched in one place.
pub fn classify(err: &mongodb::error::Error) -> StoreError {
    use mongodb::error::ErrorKind;

    if is_duplicate_key(err) {
        return StoreError::DuplicateId;
    }

    if is_no_transaction_support(err) {
        return StoreError::NoTransactionSupport(err.to_string());
    }

    let transient = err.labels().iter().any(|label| {
        label == "TransientTransactionError" || label == "UnknownTransactionCommitResult"
    }) || matches!(
        *err.kind,
        ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    );

    if transient {
        StoreError::Transient(err.to_string())
    } else {
        StoreError::Other(err.to_string())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(&*err.kind, mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) if we.code == 11000)
        || matches!(&*err.kind, mongodb::error::ErrorKind::BulkWrite(bwe) if bwe.write_errors.as_ref().is_some_and(|errs| errs.iter().any(|e| e.code == 11000)))
}

fn is_no_transaction_support(err: &mongodb::error::Error) -> bool {
    let msg = err.to_string();
    msg.contains("Transaction numbers are only allowed")
        || msg.contains("IllegalOperation")
        || msg.contains("transactions are not supported")
}

/// Whether the retry harness should retry, stop, or this was cancellation —
/// folded into `StoreError` itself at the call site via `classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Stop,
}

impl StoreError {
    pub fn disposition(&self) -> Disposition {
        match self {
            StoreError::Transient(_) => Disposition::Retry,
            _ => Disposition::Stop,
        }
    }
}
