//! Datalogger table ingestion
//!
//! This module reads flat datalogger tables (CSV, JSON array or NDJSON) into
//! untyped rows, then coerces them into typed readings using a column map.

mod adapter;
mod table_row;

pub use adapter::*;
pub use table_row::*;
