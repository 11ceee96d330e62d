//! sapflow-ratio - Heat-ratio extraction for heat-pulse sap-flow sensors
//!
//! Turns datalogger readings into one mean heat ratio per heat pulse through a
//! deterministic pipeline: normalization → temperature filter and episode
//! segmentation → baseline and differentials → windowed aggregation → encoding.
//!
//! ## Modules
//!
//! - **Ingestion** (`schema`): CSV / JSON / NDJSON tables into typed readings
//! - **Core** (`normalizer`, `filter`, `segmenter`, `baseline`, `aggregator`): the heat-ratio
//!   algorithm
//! - **Output** (`encoder`): inversion, flat rows, CSV and JSON export

pub mod aggregator;
pub mod baseline;
pub mod config;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod segmenter;
pub mod stats;
pub mod types;

pub use config::{CoercionPolicy, ColumnMap, DownstreamCheck, HeatRatioConfig};
pub use error::ComputeError;
pub use pipeline::{compute_heat_ratios, summarize_episodes, HeatRatioProcessor};

// Schema exports
pub use schema::{IngestReport, TableAdapter, TableFormat, TableRow};

pub use types::{HeatRatioOutput, MeanHeatRatioRecord, RawReading};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI reports
pub const PRODUCER_NAME: &str = "sapflow-ratio";
