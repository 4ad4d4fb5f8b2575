//! Keyed measurement collectors.
//!
//! Each collector is mutable, unsynchronized aggregation state owned by
//! one accumulation pipeline at a time: events fold in through a merge
//! entry point, and a read-time call produces an immutable, bounded,
//! sorted snapshot.

mod error_intervals;
mod queries;
mod service_calls;
mod summaries;

pub use error_intervals::{ErrorInterval, ErrorIntervalCollector};
pub use queries::{QueryCollector, QueryEntry};
pub use service_calls::{ServiceCallCollector, ServiceCallEntry};
pub use summaries::{
    ErrorCounts, ErrorSortOrder, ErrorSummary, ErrorSummaryCollector, ErrorSummaryResult,
    OverallSummary, SummaryCollector, SummaryResult, SummarySortOrder, TransactionSummary,
};
