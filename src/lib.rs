pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod reporting;
pub mod utils;

pub use config::{OutputPaths, RuntimePolicy};
pub use engine::run_probe;
pub use errors::ProbeError;
pub use models::{Attempt, Classification, DetectionMethod, HttpMethod, ScanRequest, ScanResult};
