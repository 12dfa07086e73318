pub mod core;
pub mod event;
pub mod offset;
pub mod position;
pub mod row;
pub mod schema;
pub mod staging;

pub use core::{BatchId, SourceId, Value};
pub use event::{BinlogPosition, ColumnChange, Event, EventId, EventMeta, EventSource};
pub use offset::OffsetRecord;
pub use position::{Coordinate, FileOffset, PositionToken};
pub use row::{Op, RawRow, RawRowEvent};
pub use schema::{SchemaRecord, SchemaTable};
pub use staging::{BatchStatus, StagingBatch};
