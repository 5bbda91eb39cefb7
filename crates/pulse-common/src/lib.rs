//! Metric model shared by the pulse agent and server.
//!
//! A [`Metric`](types::Metric) is a named [`MetricValue`](types::MetricValue):
//! gauges overwrite, counters accumulate. The wire representation is
//! [`MetricDto`](types::MetricDto), and [`Signer`](hash::Signer) attaches and
//! checks the keyed integrity hash on both sides of the connection.

pub mod env;
pub mod error;
pub mod hash;
pub mod shutdown;
pub mod types;

pub use error::MetricError;
pub use hash::Signer;
pub use types::{Metric, MetricDto, MetricInput, MetricKind, MetricValue, RawValue};
