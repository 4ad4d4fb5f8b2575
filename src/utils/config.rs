//! Configuration and constants for the aggregation engine.

/// Current snapshot schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Constants for histogram mode conversion
// Exact mode stores raw values; past the ceiling the histogram converts
// (one way, never back) to the compressed approximate structure.
pub const HISTOGRAM_EXACT_CEILING: usize = 1024;
pub const HISTOGRAM_SIGFIGS: u8 = 3;

/// Default per-type cardinality limit for query entries
pub const DEFAULT_QUERY_LIMIT: usize = 500;

/// Default per-type cardinality limit for service-call entries
pub const DEFAULT_SERVICE_CALL_LIMIT: usize = 500;

/// Default per-name entry limit for summary snapshots
pub const DEFAULT_SUMMARY_LIMIT: usize = 50;

/// Synthetic key absorbing entries evicted past a cardinality limit.
///
/// Data sources that pre-aggregate their own overflow report it under
/// this same key, so totals fold together instead of replacing.
pub const OVERFLOW_BUCKET_KEY: &str = "LIMIT EXCEEDED BUCKET";
