//! HTTP middleware components.

pub mod metrics;

pub use metrics::record_metrics;
