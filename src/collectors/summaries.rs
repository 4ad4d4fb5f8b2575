//! Overall and per-transaction-name summaries.
//!
//! The simplest collectors: purely additive merges, with the sort order
//! chosen at read time. Average and rate comparisons cross-multiply in
//! u128 instead of dividing, so ordering is exact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sort orders for duration summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummarySortOrder {
    TotalTime,
    AverageTime,
    Throughput,
}

/// Sort orders for error summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSortOrder {
    ErrorCount,
    ErrorRate,
}

/// Cross-transaction duration totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OverallSummary {
    pub total_duration_nanos: u64,
    pub transaction_count: u64,
}

/// Duration totals for one transaction name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub transaction_name: String,
    pub total_duration_nanos: u64,
    pub transaction_count: u64,
}

/// Sorted, limited summary snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub overall: OverallSummary,
    pub transactions: Vec<TransactionSummary>,

    /// Whether the limit cut entries off
    pub more_available: bool,
}

/// Additively merges duration totals, overall and per transaction name.
#[derive(Debug, Clone, Default)]
pub struct SummaryCollector {
    overall: OverallSummary,
    by_name: HashMap<String, OverallSummary>,
}

impl SummaryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_summary(
        &mut self,
        transaction_name: &str,
        total_duration_nanos: u64,
        transaction_count: u64,
    ) {
        self.overall.total_duration_nanos += total_duration_nanos;
        self.overall.transaction_count += transaction_count;
        let entry = self.by_name.entry(transaction_name.to_string()).or_default();
        entry.total_duration_nanos += total_duration_nanos;
        entry.transaction_count += transaction_count;
    }

    /// Sorted snapshot with at most `limit` per-name entries.
    pub fn result(&self, sort_order: SummarySortOrder, limit: usize) -> SummaryResult {
        let mut transactions: Vec<TransactionSummary> = self
            .by_name
            .iter()
            .map(|(name, summary)| TransactionSummary {
                transaction_name: name.clone(),
                total_duration_nanos: summary.total_duration_nanos,
                transaction_count: summary.transaction_count,
            })
            .collect();

        transactions.sort_by(|a, b| {
            let ordering = match sort_order {
                SummarySortOrder::TotalTime => {
                    b.total_duration_nanos.cmp(&a.total_duration_nanos)
                }
                SummarySortOrder::AverageTime => {
                    // avg(b) vs avg(a) without division:
                    // b.dur/b.count > a.dur/a.count  <=>  b.dur*a.count > a.dur*b.count
                    let lhs = b.total_duration_nanos as u128 * a.transaction_count as u128;
                    let rhs = a.total_duration_nanos as u128 * b.transaction_count as u128;
                    lhs.cmp(&rhs)
                }
                SummarySortOrder::Throughput => b.transaction_count.cmp(&a.transaction_count),
            };
            ordering.then_with(|| a.transaction_name.cmp(&b.transaction_name))
        });

        let more_available = transactions.len() > limit;
        transactions.truncate(limit);

        SummaryResult {
            overall: self.overall,
            transactions,
            more_available,
        }
    }
}

/// Error totals, either overall or for one transaction name.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ErrorCounts {
    pub error_count: u64,
    pub transaction_count: u64,
}

/// Error totals for one transaction name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub transaction_name: String,
    pub error_count: u64,
    pub transaction_count: u64,
}

/// Sorted, limited error-summary snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummaryResult {
    pub overall: ErrorCounts,
    pub transactions: Vec<ErrorSummary>,
    pub more_available: bool,
}

/// Additively merges error totals, overall and per transaction name.
#[derive(Debug, Clone, Default)]
pub struct ErrorSummaryCollector {
    overall: ErrorCounts,
    by_name: HashMap<String, ErrorCounts>,
}

impl ErrorSummaryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_error_summary(
        &mut self,
        transaction_name: &str,
        error_count: u64,
        transaction_count: u64,
    ) {
        self.overall.error_count += error_count;
        self.overall.transaction_count += transaction_count;
        let entry = self.by_name.entry(transaction_name.to_string()).or_default();
        entry.error_count += error_count;
        entry.transaction_count += transaction_count;
    }

    /// Sorted snapshot with at most `limit` per-name entries.
    pub fn result(&self, sort_order: ErrorSortOrder, limit: usize) -> ErrorSummaryResult {
        let mut transactions: Vec<ErrorSummary> = self
            .by_name
            .iter()
            .map(|(name, counts)| ErrorSummary {
                transaction_name: name.clone(),
                error_count: counts.error_count,
                transaction_count: counts.transaction_count,
            })
            .collect();

        transactions.sort_by(|a, b| {
            let ordering: Ordering = match sort_order {
                ErrorSortOrder::ErrorCount => b.error_count.cmp(&a.error_count),
                ErrorSortOrder::ErrorRate => {
                    let lhs = b.error_count as u128 * a.transaction_count as u128;
                    let rhs = a.error_count as u128 * b.transaction_count as u128;
                    lhs.cmp(&rhs)
                }
            };
            ordering.then_with(|| a.transaction_name.cmp(&b.transaction_name))
        });

        let more_available = transactions.len() > limit;
        transactions.truncate(limit);

        ErrorSummaryResult {
            overall: self.overall,
            transactions,
            more_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_collector() -> SummaryCollector {
        let mut collector = SummaryCollector::new();
        collector.merge_summary("/checkout", 1_000, 10); // avg 100
        collector.merge_summary("/login", 600, 2); // avg 300
        collector.merge_summary("/health", 50, 50); // avg 1
        collector
    }

    #[test]
    fn test_merges_are_additive() {
        let mut collector = SummaryCollector::new();
        collector.merge_summary("/a", 100, 1);
        collector.merge_summary("/a", 200, 2);

        let result = collector.result(SummarySortOrder::TotalTime, 10);
        assert_eq!(result.overall.total_duration_nanos, 300);
        assert_eq!(result.overall.transaction_count, 3);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].total_duration_nanos, 300);
    }

    #[test]
    fn test_sort_by_total_time() {
        let result = loaded_collector().result(SummarySortOrder::TotalTime, 10);
        let names: Vec<&str> = result
            .transactions
            .iter()
            .map(|t| t.transaction_name.as_str())
            .collect();
        assert_eq!(names, ["/checkout", "/login", "/health"]);
        assert!(!result.more_available);
    }

    #[test]
    fn test_sort_by_average_time() {
        let result = loaded_collector().result(SummarySortOrder::AverageTime, 10);
        let names: Vec<&str> = result
            .transactions
            .iter()
            .map(|t| t.transaction_name.as_str())
            .collect();
        assert_eq!(names, ["/login", "/checkout", "/health"]);
    }

    #[test]
    fn test_sort_by_throughput() {
        let result = loaded_collector().result(SummarySortOrder::Throughput, 10);
        assert_eq!(result.transactions[0].transaction_name, "/health");
    }

    #[test]
    fn test_limit_reports_more_available() {
        let result = loaded_collector().result(SummarySortOrder::TotalTime, 2);
        assert_eq!(result.transactions.len(), 2);
        assert!(result.more_available);
        // Overall totals are unaffected by the limit
        assert_eq!(result.overall.total_duration_nanos, 1_650);
    }

    #[test]
    fn test_error_sort_by_count_and_rate() {
        let mut collector = ErrorSummaryCollector::new();
        collector.merge_error_summary("/checkout", 10, 100); // rate 0.10
        collector.merge_error_summary("/login", 8, 16); // rate 0.50

        let by_count = collector.result(ErrorSortOrder::ErrorCount, 10);
        assert_eq!(by_count.transactions[0].transaction_name, "/checkout");

        let by_rate = collector.result(ErrorSortOrder::ErrorRate, 10);
        assert_eq!(by_rate.transactions[0].transaction_name, "/login");
        assert_eq!(by_rate.overall.error_count, 18);
        assert_eq!(by_rate.overall.transaction_count, 116);
    }
}
