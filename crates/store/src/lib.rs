pub mod error;
pub mod mongo;
pub mod retry;
pub mod sink;

pub use error::StoreError;
pub use mongo::{CollectionNames, MongoSink};
pub use retry::{RetryDisposition, RetryHarness, RetryOutcome};
pub use sink::Sink;
