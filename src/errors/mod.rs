pub mod types;
pub mod classification;
pub mod retry;

pub use types::ProbeError;
pub use classification::ErrorClassification;
pub use retry::{RetryConfig, RetryOutcome, with_retry};
