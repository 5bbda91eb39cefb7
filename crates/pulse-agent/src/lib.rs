//! Pulse agent: samples host and process statistics on a poll tick and
//! ships them to the server on a report tick.

pub mod buffer;
pub mod config;
pub mod reporter;

pub use buffer::{collect_all, SampleBuffer};
pub use config::AgentConfig;
pub use reporter::{ReportError, Reporter};
