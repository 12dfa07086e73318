use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::doc;
use model::{BatchId, Coordinate, Event, OffsetRecord, SourceId, StagingBatch};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Disposition, StoreError};
use crate::retry::{RetryHarness, RetryOutcome};

/// Names of the three collections the audit store owns. `events` and
/// `offsets` are the durable record; `staging` exists only to make an
/// interrupted commit recoverable. The staging collection is always
/// `<events>_staging` rather than independently configurable.
#[derive(Debug, Clone)]
pub struct CollectionNames {
    pub events: String,
    pub offsets: String,
    pub staging: String,
}

impl CollectionNames {
    pub fn new(events: impl Into<String>, offsets: impl Into<String>) -> Self {
        let events = events.into();
        let staging = format!("{events}_staging");
        Self { events, offsets: offsets.into(), staging }
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self::new("events", "offsets")
    }
}

/// The MongoDB-backed implementation of [`crate::sink::Sink`]. Every commit
/// attempt prefers a multi-document transaction; when the deployment's
/// topology cannot support one, it falls back to the documented sequential
/// write order and logs the degradation exactly once. Fallback recovery is
/// best-effort and does not retroactively upgrade to atomic once a
/// deployment has shown it lacks support.
pub struct MongoSink {
    events: Collection<Event>,
    offsets: Collection<OffsetRecord>,
    staging: Collection<StagingBatch>,
    retry: RetryHarness,
    warned_no_txn: AtomicBool,
}

impl MongoSink {
    pub async fn connect(uri: &str, db_name: &str, names: CollectionNames) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(uri).await.map_err(StoreError::from)?;
        let client = Client::with_options(options).map_err(StoreError::from)?;
        let db: Database = client.database(db_name);
        Ok(Self::new(db, names, RetryHarness::default()))
    }

    pub fn new(db: Database, names: CollectionNames, retry: RetryHarness) -> Self {
        Self {
            events: db.collection(&names.events),
            offsets: db.collection(&names.offsets),
            staging: db.collection(&names.staging),
            retry,
            warned_no_txn: AtomicBool::new(false),
        }
    }

    async fn stage(&self, batch: &StagingBatch) -> Result<(), StoreError> {
        self.staging.insert_one(batch).await?;
        Ok(())
    }

    async fn mark_committed(&self, batch_id: &BatchId) {
        let now = chrono::Utc::now();
        let result = self
            .staging
            .update_one(
                doc! { "batch_id": batch_id.as_str() },
                doc! { "$set": { "status": "committed", "committed_at": bson::DateTime::from_chrono(now) } },
            )
            .await;
        if let Err(err) = result {
            // Best-effort: the batch is already durably committed
            // in `events`/`offsets`; a failure here only delays Recovery's
            // archival of this staging document, never data loss.
            warn!(error = %err, batch_id = %batch_id, "failed to mark staging batch committed");
        }
    }

    async fn commit_atomic(
        &self,
        source_id: &SourceId,
        events: &[Event],
        coord: &Coordinate,
    ) -> Result<(), StoreError> {
        let mut session = self.events.client().start_session().await?;
        session.start_transaction().await?;

        let insert_result = self.insert_events_absorbing_duplicates_with_session(events, &mut session).await;
        if let Err(err) = insert_result {
            let _ = session.abort_transaction().await;
            return Err(err);
        }

        let offset = OffsetRecord::new(source_id.clone(), coord.clone(), chrono::Utc::now());
        let upsert_result = self
            .offsets
            .update_one(doc! { "source_id": source_id.as_str() }, doc! { "$set": bson::to_document(&offset)? })
            .upsert(true)
            .session(&mut session)
            .await;
        if let Err(err) = upsert_result {
            let _ = session.abort_transaction().await;
            return Err(StoreError::from(err));
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn insert_events_absorbing_duplicates_with_session(
        &self,
        events: &[Event],
        session: &mut mongodb::ClientSession,
    ) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        match self.events.insert_many(events).ordered(false).session(session).await {
            Ok(_) => Ok(()),
            Err(err) => match StoreError::from(err) {
                // A replay of an already-committed batch: every id it would
                // insert already exists. Treated as success.
                StoreError::DuplicateId => Ok(()),
                other => Err(other),
            },
        }
    }

    async fn commit_non_atomic(
        &self,
        source_id: &SourceId,
        events: &[Event],
        coord: &Coordinate,
    ) -> Result<(), StoreError> {
        if !events.is_empty() {
            match self.events.insert_many(events).ordered(false).await {
                Ok(_) => {}
                Err(err) => match StoreError::from(err) {
                    StoreError::DuplicateId => {}
                    other => return Err(other),
                },
            }
        }

        let offset = OffsetRecord::new(source_id.clone(), coord.clone(), chrono::Utc::now());
        self.offsets
            .update_one(doc! { "source_id": source_id.as_str() }, doc! { "$set": bson::to_document(&offset)? })
            .upsert(true)
            .await?;
        Ok(())
    }

    fn warn_no_transaction_support_once(&self, detail: &str) {
        if self.warned_no_txn.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            warn!(
                detail,
                "audit store deployment does not support multi-document transactions; \
                 falling back to non-atomic commit order for the remainder of this run"
            );
        }
    }
}

#[async_trait]
impl crate::sink::Sink for MongoSink {
    async fn load_offset(&self, source_id: &SourceId) -> Result<Option<Coordinate>, StoreError> {
        let cancel = CancellationToken::new();
        let outcome = self
            .retry
            .run(
                &cancel,
                || async { self.offsets.find_one(doc! { "source_id": source_id.as_str() }).await.map_err(StoreError::from) },
                |err: &StoreError| match err.disposition() {
                    Disposition::Retry => crate::retry::RetryDisposition::Retry,
                    Disposition::Stop => crate::retry::RetryDisposition::Stop,
                },
            )
            .await;

        match outcome {
            RetryOutcome::Success(found) => Ok(found.map(|record| record.coord)),
            RetryOutcome::Fatal(err) => Err(err),
            RetryOutcome::AttemptsExceeded(err) => Err(StoreError::Unavailable(err.to_string())),
            RetryOutcome::Cancelled => Err(StoreError::Other("load_offset cancelled".to_string())),
        }
    }

    async fn commit(
        &self,
        batch_id: &BatchId,
        source_id: &SourceId,
        events: &[Event],
        coord: &Coordinate,
    ) -> Result<(), StoreError> {
        let batch = StagingBatch::new(batch_id.clone(), source_id.clone(), events.to_vec(), coord.clone(), chrono::Utc::now());

        let cancel = CancellationToken::new();
        let outcome = self
            .retry
            .run(
                &cancel,
                || async {
                    match self.stage(&batch).await {
                        Ok(()) => {}
                        // A retried attempt re-staging the same batch id:
                        // already durable from an earlier attempt.
                        Err(StoreError::DuplicateId) => {}
                        Err(other) => return Err(other),
                    }

                    match self.commit_atomic(source_id, events, coord).await {
                        Ok(()) => Ok(()),
                        Err(StoreError::NoTransactionSupport(detail)) => {
                            self.warn_no_transaction_support_once(&detail);
                            self.commit_non_atomic(source_id, events, coord).await
                        }
                        Err(other) => Err(other),
                    }
                },
                |err: &StoreError| match err.disposition() {
                    Disposition::Retry => crate::retry::RetryDisposition::Retry,
                    Disposition::Stop => crate::retry::RetryDisposition::Stop,
                },
            )
            .await;

        match outcome {
            RetryOutcome::Success(()) => {
                self.mark_committed(batch_id).await;
                debug!(batch_id = %batch_id, source_id = %source_id, "batch committed");
                Ok(())
            }
            RetryOutcome::Fatal(err) => Err(err),
            RetryOutcome::AttemptsExceeded(err) => Err(StoreError::Unavailable(err.to_string())),
            RetryOutcome::Cancelled => Err(StoreError::Other("commit cancelled".to_string())),
        }
    }

    async fn recover(&self, source_id: &SourceId) -> Result<(), StoreError> {
        let mut cursor = self
            .staging
            .find(doc! { "source_id": source_id.as_str(), "status": "pending" })
            .await?;

        let mut archived = 0u64;
        use futures_util::TryStreamExt;
        while let Some(batch) = cursor.try_next().await? {
            let now = chrono::Utc::now();
            self.staging
                .update_one(
                    doc! { "batch_id": batch.batch_id.as_str() },
                    doc! { "$set": { "status": "archived", "archived_at": bson::DateTime::from_chrono(now) } },
                )
                .await?;
            archived += 1;
        }

        if archived > 0 {
            info!(source_id = %source_id, archived, "archived interrupted batches without replay");
        }
        Ok(())
    }
}
