//! One aggregation session: the full collector set for one rollup
//! period.
//!
//! A `Rollup` owns one of each collector, so all interning and
//! accumulation state is scoped to the session rather than the process.
//! It is single-owner mutable state: the calling layer either
//! single-threads access or shards by period/transaction-type and merges
//! shard results afterwards through the collectors' own merge entry
//! points.

use crate::collectors::{
    ErrorIntervalCollector, ErrorSummaryCollector, QueryCollector, ServiceCallCollector,
    SummaryCollector,
};
use crate::histogram::LatencyHistogram;
use crate::profile::ProfileTree;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::WireError;
use crate::wire::{RollupSnapshot, SnapshotOptions};
use chrono::Utc;
use log::info;

/// The collector set for one rollup period.
#[derive(Debug, Clone, Default)]
pub struct Rollup {
    pub summaries: SummaryCollector,
    pub error_summaries: ErrorSummaryCollector,
    pub queries: QueryCollector,
    pub service_calls: ServiceCallCollector,
    pub error_intervals: ErrorIntervalCollector,
    pub duration_histogram: LatencyHistogram,
    pub profile: ProfileTree,
}

impl Rollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the bounded, sorted snapshot of everything accumulated.
    ///
    /// **Public** - main entry point for the export layer
    ///
    /// # Arguments
    /// * `options` - read-time sort orders and limits
    ///
    /// # Returns
    /// A versioned, timestamped snapshot. The rollup itself is not
    /// consumed or mutated; accumulation can continue afterwards.
    ///
    /// # Errors
    /// * `WireError::HistogramEncode` - the duration histogram's
    ///   compressed payload could not be written
    pub fn snapshot(&self, options: &SnapshotOptions) -> Result<RollupSnapshot, WireError> {
        info!(
            "assembling rollup snapshot ({} profile samples)",
            self.profile.total_sample_count()
        );
        Ok(RollupSnapshot {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            summaries: self
                .summaries
                .result(options.summary_sort, options.summary_limit),
            error_summaries: self
                .error_summaries
                .result(options.error_sort, options.summary_limit),
            queries: self.queries.result(),
            service_calls: self.service_calls.result(),
            error_intervals: self.error_intervals.merged_intervals(),
            duration_histogram: self.duration_histogram.to_wire()?,
            profile: self.profile.to_wire(),
        })
    }
}
