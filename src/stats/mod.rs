//! Receive statistics

pub mod metrics;

pub use metrics::{ReceiverStats, StatsSnapshot};
