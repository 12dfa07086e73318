pub mod error;
pub mod recovery;
pub mod shutdown;
pub mod supervisor;

pub use error::RuntimeError;
pub use supervisor::run;
