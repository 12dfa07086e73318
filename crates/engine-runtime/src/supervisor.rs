use std::sync::Arc;
use std::time::Duration;

use config::Settings;
use connectors::{MySqlReplicationReader, ReplicationConfig, ReplicationReader, StartPosition};
use engine_core::{Handler, TableFilter, DEFAULT_BATCH_SIZE};
use model::SourceId;
use store::{CollectionNames, MongoSink, Sink};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::RuntimeError;

/// Shutdown flush deadline: a failure here is logged, not
/// propagated — the next run's recovery reconciles whatever did not make
/// it out in time.
const SHUTDOWN_FLUSH_DEADLINE: Duration = Duration::from_secs(30);

/// Starts Recovery, then the reader, then serves the shutdown signal.
/// Owns the tree of the sink, handler, and reader for the
/// lifetime of one run.
pub async fn run(settings: Settings) -> Result<(), RuntimeError> {
    let cancel = CancellationToken::new();
    crate::shutdown::register_signal_handlers(cancel.clone());

    let source_id = SourceId::new(format!("{}://{}", settings.source_flavor, settings.source_addr));
    let collection_names = CollectionNames::new(&settings.store_events_coll, &settings.store_offsets_coll);
    let sink: Arc<dyn Sink> = Arc::new(MongoSink::connect(&settings.store_uri, &settings.store_db, collection_names).await?);

    crate::recovery::run(sink.as_ref(), &source_id).await?;

    let start = match sink.load_offset(&source_id).await? {
        Some(coord) => StartPosition::Token(coord.token),
        None => {
            warn!(source_id = %source_id, "no prior offset recorded; starting from the source's current position");
            StartPosition::SourceCurrent
        }
    };

    let filter = TableFilter::new(settings.include_regex.clone(), settings.exclude_regex.clone());
    let handler = Handler::new(source_id, sink.clone(), DEFAULT_BATCH_SIZE, settings.tz, filter);

    let repl_config = ReplicationConfig {
        addr: settings.source_addr.clone(),
        user: settings.source_user.clone(),
        pass: settings.source_pass.clone(),
        flavor: settings.source_flavor.clone(),
        client_id: settings.source_client_id,
    };
    let mut reader = MySqlReplicationReader::new(&repl_config)?;

    let reader_cancel = cancel.clone();
    let reader_task = tokio::spawn(async move {
        let mut handler = handler;
        let result = reader.run(start, &mut handler, reader_cancel).await;
        (result, handler)
    });

    let (result, mut handler) = reader_task.await?;

    match result {
        Ok(()) => {
            info!("reader stopped; flushing the in-memory batch before exit");
            match tokio::time::timeout(SHUTDOWN_FLUSH_DEADLINE, handler.flush()).await {
                Ok(Ok(())) => info!("final flush complete"),
                Ok(Err(err)) => warn!(error = %err, "final flush failed; next run's recovery will reconcile"),
                Err(_) => warn!("final flush timed out; next run's recovery will reconcile"),
            }
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "replication reader terminated with an error");
            Err(RuntimeError::from(err))
        }
    }
}
