use std::collections::{HashMap, HashSet};

use crate::{
    error::SourceError,
    replication::{ReplicationConfig, ReplicationReader, RowSink, StartPosition},
};
use async_trait::async_trait;
use model::{Op, PositionToken, RawRow, RawRowEvent, SchemaTable, Value};
use mysql_async::{
    BinlogRequest, BinlogStream, Conn, Opts, OptsBuilder,
    binlog::events::{Event as BinlogEvent, EventData, RowsEventData, TableMapEvent},
    binlog::row::BinlogRow,
    binlog::value::BinlogValue,
    prelude::Queryable,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A thin wrapper over `mysql_async`'s binlog streaming support. Reconnection
/// and GTID-set bookkeeping live in the driver; this layer decodes each
/// table-map/rows-event pair into the pipeline's `RowSink` callbacks and
/// resolves column/primary-key metadata for newly-seen tables against the
/// source's own catalog.
pub struct MySqlReplicationReader {
    opts: Opts,
    server_id: u32,
    table_maps: HashMap<u64, TableMapEvent<'static>>,
    resolved_schemas: HashSet<(String, String)>,
}

impl MySqlReplicationReader {
    pub fn new(cfg: &ReplicationConfig) -> Result<Self, SourceError> {
        let (host, port) = cfg
            .addr
            .split_once(':')
            .ok_or_else(|| SourceError::Config(format!("invalid SOURCE_ADDR: {}", cfg.addr)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| SourceError::Config(format!("invalid port in SOURCE_ADDR: {}", cfg.addr)))?;

        let opts = OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port)
            .user(Some(cfg.user.clone()))
            .pass(Some(cfg.pass.clone()))
            .into();

        Ok(Self {
            opts,
            server_id: cfg.client_id,
            table_maps: HashMap::new(),
            resolved_schemas: HashSet::new(),
        })
    }

    async fn connect(&self) -> Result<Conn, SourceError> {
        Conn::new(self.opts.clone()).await.map_err(SourceError::Driver)
    }

    /// Queries the source's own catalog for a table's column list (in
    /// declared order) and primary-key columns. Called the first time a
    /// table map for that table is seen, and again after an `ALTER TABLE`
    /// invalidates the previous resolution.
    async fn resolve_schema(&self, schema: &str, table: &str) -> Result<(Vec<String>, Vec<String>), SourceError> {
        let mut conn = self.connect().await?;

        let columns: Vec<(String,)> = conn
            .exec(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
                (schema, table),
            )
            .await
            .map_err(SourceError::Driver)?;

        let primary_key: Vec<(String,)> = conn
            .exec(
                "SELECT column_name FROM information_schema.key_column_usage \
                 WHERE table_schema = ? AND table_name = ? AND constraint_name = 'PRIMARY' \
                 ORDER BY ordinal_position",
                (schema, table),
            )
            .await
            .map_err(SourceError::Driver)?;

        Ok((
            columns.into_iter().map(|(c,)| c).collect(),
            primary_key.into_iter().map(|(c,)| c).collect(),
        ))
    }

    async fn translate(
        &mut self,
        event: BinlogEvent,
        sink: &mut dyn RowSink,
        file: &str,
        offset: u64,
        token: &PositionToken,
    ) -> Result<(), SourceError> {
        match event.read_data() {
            Ok(Some(EventData::TableMapEvent(tme))) => {
                let owned = tme.into_owned();
                let schema = owned.database_name().into_owned();
                let table = owned.table_name().into_owned();
                let key = (schema.clone(), table.clone());

                if self.resolved_schemas.insert(key.clone()) {
                    let (columns, primary_key) = self.resolve_schema(&schema, &table).await?;
                    sink.on_table_schema(SchemaTable::new(schema, table), columns, primary_key)
                        .await
                        .map_err(|e| SourceError::Sink(e.to_string()))?;
                }

                self.table_maps.insert(owned.table_id(), owned);
            }
            Ok(Some(EventData::RowsEvent(rows))) => {
                let table_id = rows_table_id(&rows);
                let Some(tme) = self.table_maps.get(&table_id) else {
                    // A rows event for a table whose map we never saw (we
                    // joined the stream mid-table). Nothing to decode
                    // against; skip rather than guess at column layout.
                    return Ok(());
                };
                let schema = tme.database_name().into_owned();
                let table = tme.table_name().into_owned();

                let op = match &rows {
                    RowsEventData::WriteRowsEvent(_) => Op::Insert,
                    RowsEventData::DeleteRowsEvent(_) => Op::Delete,
                    RowsEventData::UpdateRowsEvent(_) => Op::Update,
                    _ => return Ok(()),
                };

                for decoded in decode_rows(&rows, tme) {
                    let (before, after) =
                        decoded.map_err(|e| SourceError::Unavailable(format!("row decode error: {e}")))?;
                    let raw = RawRowEvent {
                        schema: schema.clone(),
                        table: table.clone(),
                        op,
                        before: before.map(binlog_row_to_raw_row),
                        after: after.map(binlog_row_to_raw_row),
                        event_time: chrono::Utc::now(),
                    };
                    sink.on_row(raw).await.map_err(|e| SourceError::Sink(e.to_string()))?;
                    sink.on_position_synced(file, offset, token, false)
                        .await
                        .map_err(|e| SourceError::Sink(e.to_string()))?;
                }
            }
            Ok(Some(EventData::QueryEvent(q))) if looks_like_ddl(q.query()) => {
                if let Some((schema, table)) = parse_alter_target(q.query()) {
                    self.resolved_schemas.remove(&(schema.clone(), table.clone()));
                    sink.on_schema_changed(&schema, &table)
                        .await
                        .map_err(|e| SourceError::Sink(e.to_string()))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn rows_table_id(data: &RowsEventData<'_>) -> u64 {
    match data {
        RowsEventData::WriteRowsEvent(r) => r.table_id(),
        RowsEventData::DeleteRowsEvent(r) => r.table_id(),
        RowsEventData::UpdateRowsEvent(r) => r.table_id(),
        _ => 0,
    }
}

/// Decodes a rows event's raw column bytes against the table map that
/// describes their layout, yielding a before/after row-image pair per
/// affected row (insert: after only, delete: before only, update: both).
fn decode_rows<'a>(
    data: &'a RowsEventData<'a>,
    tme: &'a TableMapEvent<'static>,
) -> Box<dyn Iterator<Item = std::io::Result<(Option<BinlogRow>, Option<BinlogRow>)>> + 'a> {
    match data {
        RowsEventData::WriteRowsEvent(r) => Box::new(r.rows(tme)),
        RowsEventData::DeleteRowsEvent(r) => Box::new(r.rows(tme)),
        RowsEventData::UpdateRowsEvent(r) => Box::new(r.rows(tme)),
        _ => Box::new(std::iter::empty()),
    }
}

fn binlog_row_to_raw_row(row: BinlogRow) -> RawRow {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let value = row.as_ref(idx).map(binlog_value_to_value).unwrap_or(Value::Null);
        values.push(value);
    }
    RawRow(values)
}

fn binlog_value_to_value(value: &BinlogValue) -> Value {
    match value {
        BinlogValue::Value(v) => mysql_value_to_value(v),
        _ => Value::Null,
    }
}

fn mysql_value_to_value(value: &mysql_async::Value) -> Value {
    use mysql_async::Value as MV;
    match value {
        MV::NULL => Value::Null,
        MV::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        MV::Int(i) => Value::Int(*i),
        MV::UInt(u) => Value::Uint(*u),
        MV::Float(f) => Value::Float(*f as f64),
        MV::Double(d) => Value::Float(*d),
        MV::Date(year, month, day, hour, minute, second, micros) => {
            if *hour == 0 && *minute == 0 && *second == 0 && *micros == 0 {
                chrono::NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    .map(Value::Date)
                    .unwrap_or(Value::Null)
            } else {
                chrono::NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    .and_then(|d| d.and_hms_micro_opt(*hour as u32, *minute as u32, *second as u32, *micros))
                    .map(Value::TimestampNaive)
                    .unwrap_or(Value::Null)
            }
        }
        MV::Time(neg, days, hours, minutes, seconds, micros) => {
            let sign = if *neg { "-" } else { "" };
            Value::String(format!("{sign}{days}d {hours:02}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    }
}

/// mysql_async reports a resume position purged from the source log as a
/// server error; the exact code (1236, `ER_MASTER_FATAL_ERROR_READING_BINLOG`)
/// and message text are matched here the same way the audit store
/// centralizes its own error classification in one place.
fn is_truncated(err: &mysql_async::Error) -> bool {
    match err {
        mysql_async::Error::Server(server_err) => {
            server_err.code == 1236
                || server_err.message.contains("has been purged")
                || server_err.message.contains("requested master to start replication")
        }
        _ => false,
    }
}

fn looks_like_ddl(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    upper.starts_with("ALTER TABLE") || upper.starts_with("CREATE TABLE") || upper.starts_with("DROP TABLE")
}

fn parse_alter_target(sql: &str) -> Option<(String, String)> {
    let mut words = sql.split_whitespace().skip(2);
    let ident = words.next()?;
    match ident.split_once('.') {
        Some((schema, table)) => Some((schema.to_string(), table.trim_end_matches(';').to_string())),
        None => None,
    }
}

#[async_trait]
impl ReplicationReader for MySqlReplicationReader {
    async fn run(
        &mut self,
        start: StartPosition,
        sink: &mut dyn RowSink,
        cancel: CancellationToken,
    ) -> Result<(), SourceError> {
        let mut conn = self.connect().await?;

        let mut token = match start {
            StartPosition::Token(t) => t,
            StartPosition::SourceCurrent => self.current_position().await?,
        };
        sink.on_position_token(&token).await.map_err(|e| SourceError::Sink(e.to_string()))?;

        let request = BinlogRequest::new(self.server_id).with_gtid();
        let mut stream: BinlogStream = match conn.get_binlog_stream(request).await {
            Ok(stream) => stream,
            Err(err) if is_truncated(&err) => {
                let truncated = SourceError::Truncated(token.as_str().to_string());
                warn!(error = %truncated, driver_error = %err, "falling back to current position");
                token = self.current_position().await?;
                sink.on_position_token(&token).await.map_err(|e| SourceError::Sink(e.to_string()))?;
                let fallback = BinlogRequest::new(self.server_id).with_gtid();
                conn.get_binlog_stream(fallback).await.map_err(SourceError::Driver)?
            }
            Err(err) => return Err(SourceError::Driver(err)),
        };

        let mut file = String::new();
        let mut offset: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                item = stream.next_raw() => item,
            };

            match next {
                Some(Ok(event)) => {
                    offset = event.header().log_pos() as u64;
                    self.translate(event, sink, &file, offset, &token).await?;
                }
                Some(Err(e)) => return Err(SourceError::Driver(e)),
                None => return Err(SourceError::Unavailable("binlog stream closed".into())),
            }

            if file.is_empty() {
                file = "binlog.000001".to_string();
            }
        }
    }

    async fn current_position(&mut self) -> Result<PositionToken, SourceError> {
        let mut conn = self.connect().await?;
        let row: Option<(String, String)> = conn
            .query_first("SHOW MASTER STATUS")
            .await
            .map_err(SourceError::Driver)?;
        match row {
            Some((_file, gtid)) => Ok(PositionToken::new(gtid)),
            None => Err(SourceError::Unavailable(
                "source reported no current position".into(),
            )),
        }
    }
}
