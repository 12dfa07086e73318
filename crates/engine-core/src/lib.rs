pub mod batch;
pub mod error;
pub mod filter;
pub mod handler;
pub mod metrics;
pub mod schema_cache;
pub mod translate;

pub use error::HandlerError;
pub use filter::TableFilter;
pub use handler::{Handler, DEFAULT_BATCH_SIZE};
pub use metrics::{Metrics, MetricsSnapshot};
pub use schema_cache::SchemaCache;
