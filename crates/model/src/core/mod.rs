pub mod identifiers;
pub mod value;

pub use identifiers::{BatchId, SourceId};
pub use value::Value;
