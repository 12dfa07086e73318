pub mod error;
pub mod mysql_reader;
pub mod replication;

pub use error::SourceError;
pub use mysql_reader::MySqlReplicationReader;
pub use replication::{ReplicationConfig, ReplicationReader, RowSink, SinkFailure, StartPosition};
