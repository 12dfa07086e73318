use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use connectors::{RowSink, SinkFailure};
use model::{BatchId, Coordinate, Event, PositionToken, RawRowEvent, SchemaRecord, SchemaTable, SourceId};
use store::Sink;
use tracing::warn;

use crate::batch::Batch;
use crate::error::HandlerError;
use crate::filter::TableFilter;
use crate::metrics::Metrics;
use crate::schema_cache::SchemaCache;
use crate::translate;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Assembles row events into batches and drives the sink's commit
/// protocol. One `Handler` instance is the single implementation of
/// `RowSink`; the reader drives it sequentially, so the batch and schema
/// cache never need synchronization.
pub struct Handler {
    source_id: SourceId,
    sink: Arc<dyn Sink>,
    schema_cache: SchemaCache,
    batch: Batch,
    batch_size: usize,
    current_file: String,
    current_offset: u64,
    current_token: Option<PositionToken>,
    warned_missing_pk: HashSet<SchemaTable>,
    display_tz: Option<Tz>,
    filter: TableFilter,
    metrics: Metrics,
}

impl Handler {
    pub fn new(
        source_id: SourceId,
        sink: Arc<dyn Sink>,
        batch_size: usize,
        display_tz: Option<Tz>,
        filter: TableFilter,
    ) -> Self {
        Self {
            source_id,
            sink,
            schema_cache: SchemaCache::new(),
            batch: Batch::new(),
            batch_size: batch_size.max(1),
            current_file: String::new(),
            current_offset: 0,
            current_token: None,
            warned_missing_pk: HashSet::new(),
            display_tz,
            filter,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn schema_cache_mut(&mut self) -> &mut SchemaCache {
        &mut self.schema_cache
    }

    fn current_coord(&self) -> Coordinate {
        Coordinate::new(
            self.current_token.clone().unwrap_or_else(|| PositionToken::new("")),
            self.current_file.clone(),
            self.current_offset,
        )
    }

    fn next_batch_id(&self) -> BatchId {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let token = self.current_token.as_ref().map(PositionToken::as_str).unwrap_or("");
        BatchId::new(format!("{}-{}-{}", self.source_id, nanos, token))
    }

    fn display_timestamp(&self, ts: chrono::DateTime<chrono::Utc>) -> Option<String> {
        let tz = self.display_tz?;
        Some(ts.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
    }

    /// Commits the current buffer if non-empty, clearing it either way.
    /// Called at the size threshold, on schema change, and by the
    /// lifecycle supervisor during shutdown.
    pub async fn flush(&mut self) -> Result<(), HandlerError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let (events, coord) = self.batch.drain();
        let coord = coord.ok_or(HandlerError::MissingCoordinate)?;
        let batch_id = self.next_batch_id();
        let count = events.len() as u64;

        match self.sink.commit(&batch_id, &self.source_id, &events, &coord).await {
            Ok(()) => {
                self.metrics.increment_batches(1);
                self.metrics.increment_records(count).await;
                Ok(())
            }
            Err(err) => {
                self.metrics.increment_failures(1);
                Err(HandlerError::from(err))
            }
        }
    }

    async fn flush_if_full(&mut self) -> Result<(), HandlerError> {
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    fn warn_missing_primary_key_once(&mut self, table: &SchemaTable) {
        if self.warned_missing_pk.insert(table.clone()) {
            warn!(%table, "skipping rows: table has no known primary key");
        }
    }
}

#[async_trait]
impl RowSink for Handler {
    async fn on_row(&mut self, event: RawRowEvent) -> Result<(), SinkFailure> {
        let table = SchemaTable::new(event.schema.clone(), event.table.clone());
        if !self.filter.allows(&table) {
            return Ok(());
        }

        let schema = self.schema_cache.get(&table);

        let translated = match translate::translate(&event, schema) {
            Some(row) => row,
            None => {
                self.warn_missing_primary_key_once(&table);
                return Ok(());
            }
        };

        let coord = self.current_coord();
        let ts_display = self.display_timestamp(event.event_time);
        let built = Event::new(
            event.schema,
            event.table,
            translated.pk,
            event.op,
            event.event_time,
            translated.changes,
            coord.clone(),
            ts_display,
        );
        self.batch.push(built, coord);
        self.flush_if_full().await?;
        Ok(())
    }

    async fn on_position_synced(
        &mut self,
        file: &str,
        offset: u64,
        token: &PositionToken,
        _forced: bool,
    ) -> Result<(), SinkFailure> {
        self.current_file = file.to_string();
        self.current_offset = offset;
        self.current_token = Some(token.clone());
        Ok(())
    }

    async fn on_rotate(&mut self, next_file: &str, start_offset: u64) -> Result<(), SinkFailure> {
        self.current_file = next_file.to_string();
        self.current_offset = start_offset;
        Ok(())
    }

    async fn on_schema_changed(&mut self, schema: &str, table: &str) -> Result<(), SinkFailure> {
        self.schema_cache.invalidate(&SchemaTable::new(schema, table));
        self.flush().await?;
        Ok(())
    }

    async fn on_position_token(&mut self, token: &PositionToken) -> Result<(), SinkFailure> {
        self.current_token = Some(token.clone());
        Ok(())
    }

    async fn on_table_schema(
        &mut self,
        table: SchemaTable,
        columns: Vec<String>,
        primary_key: Vec<String>,
    ) -> Result<(), SinkFailure> {
        self.schema_cache.insert(table, SchemaRecord::new(columns, primary_key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Op, RawRow, Value};
    use std::sync::Mutex;
    use store::StoreError;

    #[derive(Default)]
    struct FakeSink {
        commits: Mutex<Vec<(BatchId, usize)>>,
    }

    #[async_trait]
    impl Sink for FakeSink {
        async fn load_offset(&self, _source_id: &SourceId) -> Result<Option<Coordinate>, StoreError> {
            Ok(None)
        }

        async fn commit(
            &self,
            batch_id: &BatchId,
            _source_id: &SourceId,
            events: &[Event],
            _coord: &Coordinate,
        ) -> Result<(), StoreError> {
            self.commits.lock().unwrap().push((batch_id.clone(), events.len()));
            Ok(())
        }

        async fn recover(&self, _source_id: &SourceId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn handler_with(batch_size: usize) -> (Handler, Arc<FakeSink>) {
        let sink = Arc::new(FakeSink::default());
        let handler = Handler::new(SourceId::new("mysql://127.0.0.1:3306"), sink.clone(), batch_size, None, TableFilter::default());
        (handler, sink)
    }

    fn row_event(op: Op, before: Option<Vec<Value>>, after: Option<Vec<Value>>) -> RawRowEvent {
        RawRowEvent {
            schema: "db".into(),
            table: "t".into(),
            op,
            before: before.map(RawRow),
            after: after.map(RawRow),
            event_time: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn on_table_schema_populates_the_cache() {
        let (mut handler, _sink) = handler_with(10);
        let table = SchemaTable::new("db", "t");
        handler
            .on_table_schema(table.clone(), vec!["id".into(), "v".into()], vec!["id".into()])
            .await
            .unwrap();
        assert!(handler.schema_cache_mut().get(&table).is_some());
    }

    #[tokio::test]
    async fn row_without_known_schema_is_dropped_without_error() {
        let (mut handler, sink) = handler_with(1);
        handler.on_row(row_event(Op::Insert, None, Some(vec![Value::Int(1)]))).await.unwrap();
        assert!(sink.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_flushes_once_it_reaches_batch_size() {
        let (mut handler, sink) = handler_with(2);
        handler
            .on_table_schema(SchemaTable::new("db", "t"), vec!["id".into()], vec!["id".into()])
            .await
            .unwrap();

        handler.on_row(row_event(Op::Insert, None, Some(vec![Value::Int(1)]))).await.unwrap();
        assert!(sink.commits.lock().unwrap().is_empty());

        handler.on_row(row_event(Op::Insert, None, Some(vec![Value::Int(2)]))).await.unwrap();
        let commits = sink.commits.lock().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].1, 2);
    }

    #[tokio::test]
    async fn flush_is_a_no_op_on_an_empty_batch() {
        let (mut handler, sink) = handler_with(10);
        handler.flush().await.unwrap();
        assert!(sink.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn schema_change_flushes_the_current_batch_and_invalidates_cache() {
        let (mut handler, sink) = handler_with(10);
        let table = SchemaTable::new("db", "t");
        handler
            .on_table_schema(table.clone(), vec!["id".into()], vec!["id".into()])
            .await
            .unwrap();
        handler.on_row(row_event(Op::Insert, None, Some(vec![Value::Int(1)]))).await.unwrap();

        handler.on_schema_changed("db", "t").await.unwrap();

        assert_eq!(sink.commits.lock().unwrap().len(), 1);
        assert!(handler.schema_cache_mut().get(&table).is_none());
    }
}
