pub mod commands;
pub mod payloads;
pub mod probe;
pub mod progress;
pub mod report;

pub use commands::{Cli, Commands};
