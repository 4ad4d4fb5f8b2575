//! Output snapshot schema definitions.
//!
//! This module defines the structure of the JSON snapshots handed to the
//! UI/export layer or passed upstream for further merging.
//! Schema is versioned to allow future evolution.

use crate::collectors::{
    ErrorInterval, ErrorSortOrder, ErrorSummaryResult, QueryEntry, ServiceCallEntry,
    SummaryResult, SummarySortOrder,
};
use crate::histogram::HistogramWire;
use crate::profile::ProfileWire;
use crate::utils::config::DEFAULT_SUMMARY_LIMIT;
use crate::utils::error::WireError;
use serde::{Deserialize, Serialize};

/// Top-level snapshot of one aggregation bucket: bounded, sorted, and
/// immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupSnapshot {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the snapshot was generated
    pub generated_at: String,

    pub summaries: SummaryResult,
    pub error_summaries: ErrorSummaryResult,
    pub queries: Vec<QueryEntry>,
    pub service_calls: Vec<ServiceCallEntry>,
    pub error_intervals: Vec<ErrorInterval>,
    pub duration_histogram: HistogramWire,
    pub profile: ProfileWire,
}

impl RollupSnapshot {
    /// Encode to the JSON wire form.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a snapshot from its JSON wire form.
    ///
    /// # Errors
    /// * `WireError::JsonError` - malformed or incompatible JSON
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Read-time choices for snapshot assembly.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub summary_sort: SummarySortOrder,
    pub error_sort: ErrorSortOrder,

    /// Maximum per-name entries in each summary list
    pub summary_limit: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            summary_sort: SummarySortOrder::TotalTime,
            error_sort: ErrorSortOrder::ErrorCount,
            summary_limit: DEFAULT_SUMMARY_LIMIT,
        }
    }
}
