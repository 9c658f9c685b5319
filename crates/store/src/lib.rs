pub mod error;
pub mod retry;
pub mod writer;

pub use error::StoreError;
pub use retry::RetryPolicy;
pub use writer::{GraphSink, GraphStats, GraphWriter, StoreSettings};
