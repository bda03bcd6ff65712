//! Deterministic matching engine
//!
//! Consumes decoded commands tagged with cluster-assigned timestamps, drives
//! per-instrument order books forward, and writes execution reports into a
//! caller-supplied buffer. Zero allocation on the matching path, no clocks,
//! no threads: replaying the same command stream always produces the same
//! byte stream.

#![deny(warnings)]
#![deny(clippy::all)]
// unsafe is confined to the AVX2 scanner kernels

pub mod config;
pub mod engine;
pub mod metrics;
pub mod scanner;
pub mod snapshot;

pub use config::EngineConfig;
pub use engine::{EngineError, MatchingEngine, RECOMMENDED_OUTPUT_LEN, REPORT_FRAME_LEN};
pub use metrics::{AtomicMetrics, MetricsSink, NoOpMetrics};
pub use scanner::PriceScanner;
pub use snapshot::{SnapshotError, SNAPSHOT_VERSION};
