//! Bounded-cardinality aggregation of query executions.
//!
//! Accumulation is unbounded and O(1) amortized per event; cardinality
//! bounding happens only at read time, where everything beyond the
//! per-type limit folds into that type's overflow entry. Deferring the
//! sort keeps the hot merge path free of the O(n log n) cost.

use crate::utils::config::{DEFAULT_QUERY_LIMIT, OVERFLOW_BUCKET_KEY};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated totals for one (type, text) query key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEntry {
    pub query_type: String,
    pub query_text: String,
    pub total_duration_nanos: u64,
    pub execution_count: u64,

    /// Row-count total; absent when the source does not report rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
}

#[derive(Debug, Clone, Default)]
struct QueryAccum {
    total_duration_nanos: u64,
    execution_count: u64,
    total_rows: Option<u64>,
}

impl QueryAccum {
    fn fold(&mut self, duration_nanos: u64, count: u64, rows: Option<u64>) {
        self.total_duration_nanos += duration_nanos;
        self.execution_count += count;
        self.total_rows = match (self.total_rows, rows) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };
    }
}

/// Merges keyed query measurements with a hard per-type cap on distinct
/// keys, enforced at read time via the overflow-bucket pattern.
///
/// **Public** - one instance per aggregation bucket.
#[derive(Debug, Clone)]
pub struct QueryCollector {
    limit: usize,
    queries: HashMap<String, HashMap<String, QueryAccum>>,
}

impl Default for QueryCollector {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_LIMIT)
    }
}

impl QueryCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            queries: HashMap::new(),
        }
    }

    /// Fold one measurement into the accumulator.
    ///
    /// A data source that pre-aggregated its own overflow reports it
    /// under [`OVERFLOW_BUCKET_KEY`]; those totals are preserved and
    /// added to at read time, never replaced.
    pub fn merge_query(
        &mut self,
        query_type: &str,
        query_text: &str,
        total_duration_nanos: u64,
        execution_count: u64,
        total_rows: Option<u64>,
    ) {
        self.queries
            .entry(query_type.to_string())
            .or_default()
            .entry(query_text.to_string())
            .or_default()
            .fold(total_duration_nanos, execution_count, total_rows);
    }

    /// Number of distinct keys currently accumulated (all types).
    pub fn entry_count(&self) -> usize {
        self.queries.values().map(HashMap::len).sum()
    }

    /// Sorted, cardinality-bounded snapshot.
    ///
    /// Per type: entries sort descending by total duration, the top
    /// `limit` stay, and the tail folds into the overflow entry. The
    /// result is re-sorted afterwards - a folded overflow total can
    /// outrank entries that were originally within the limit.
    pub fn result(&self) -> Vec<QueryEntry> {
        let mut out = Vec::new();

        let mut types: Vec<&String> = self.queries.keys().collect();
        types.sort();

        for query_type in types {
            let entries = &self.queries[query_type];
            let mut overflow = QueryAccum::default();
            let mut has_overflow = false;

            // An explicit overflow entry never competes for a limit slot
            if let Some(explicit) = entries.get(OVERFLOW_BUCKET_KEY) {
                overflow = explicit.clone();
                has_overflow = true;
            }

            let mut sortable: Vec<(&String, &QueryAccum)> = entries
                .iter()
                .filter(|(text, _)| text.as_str() != OVERFLOW_BUCKET_KEY)
                .collect();
            sortable.sort_by(|a, b| {
                b.1.total_duration_nanos
                    .cmp(&a.1.total_duration_nanos)
                    .then_with(|| a.0.cmp(b.0))
            });

            if sortable.len() > self.limit {
                debug!(
                    "folding {} query entries of type '{}' into the overflow bucket",
                    sortable.len() - self.limit,
                    query_type
                );
            }
            for (_, accum) in sortable.iter().skip(self.limit) {
                overflow.fold(
                    accum.total_duration_nanos,
                    accum.execution_count,
                    accum.total_rows,
                );
                has_overflow = true;
            }
            sortable.truncate(self.limit);

            let mut bounded: Vec<QueryEntry> = sortable
                .into_iter()
                .map(|(text, accum)| QueryEntry {
                    query_type: query_type.clone(),
                    query_text: text.clone(),
                    total_duration_nanos: accum.total_duration_nanos,
                    execution_count: accum.execution_count,
                    total_rows: accum.total_rows,
                })
                .collect();
            if has_overflow {
                bounded.push(QueryEntry {
                    query_type: query_type.clone(),
                    query_text: OVERFLOW_BUCKET_KEY.to_string(),
                    total_duration_nanos: overflow.total_duration_nanos,
                    execution_count: overflow.execution_count,
                    total_rows: overflow.total_rows,
                });
            }

            // Re-sort: folding can move the overflow entry up the list
            bounded.sort_by(|a, b| {
                b.total_duration_nanos
                    .cmp(&a.total_duration_nanos)
                    .then_with(|| a.query_text.cmp(&b.query_text))
            });
            out.extend(bounded);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation_is_unbounded() {
        let mut collector = QueryCollector::new(2);
        for i in 0..10 {
            collector.merge_query("SQL", &format!("select {i}"), i, 1, None);
        }
        // No eviction while entries are arriving
        assert_eq!(collector.entry_count(), 10);
    }

    #[test]
    fn test_overflow_folding_and_resort() {
        let mut collector = QueryCollector::new(2);
        collector.merge_query("SQL", "A", 10, 1, None);
        collector.merge_query("SQL", "B", 5, 1, None);
        collector.merge_query("SQL", "C", 20, 1, None);
        collector.merge_query("SQL", "D", 1, 1, None);

        let result = collector.result();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].query_text, "C");
        assert_eq!(result[1].query_text, "A");
        assert_eq!(result[2].query_text, OVERFLOW_BUCKET_KEY);
        assert_eq!(result[2].total_duration_nanos, 6);
        assert_eq!(result[2].execution_count, 2);
    }

    #[test]
    fn test_folded_overflow_can_outrank_kept_entries() {
        let mut collector = QueryCollector::new(1);
        collector.merge_query("SQL", "A", 10, 1, None);
        collector.merge_query("SQL", "B", 8, 1, None);
        collector.merge_query("SQL", "C", 7, 1, None);

        let result = collector.result();
        assert_eq!(result.len(), 2);
        // B + C = 15 outranks the kept A = 10 after folding
        assert_eq!(result[0].query_text, OVERFLOW_BUCKET_KEY);
        assert_eq!(result[0].total_duration_nanos, 15);
        assert_eq!(result[1].query_text, "A");
    }

    #[test]
    fn test_explicit_overflow_totals_are_added_to() {
        let mut collector = QueryCollector::new(1);
        collector.merge_query("SQL", OVERFLOW_BUCKET_KEY, 100, 50, Some(7));
        collector.merge_query("SQL", "A", 10, 1, None);
        collector.merge_query("SQL", "B", 5, 1, Some(3));

        let result = collector.result();
        assert_eq!(result.len(), 2);
        let overflow = result
            .iter()
            .find(|e| e.query_text == OVERFLOW_BUCKET_KEY)
            .unwrap();
        assert_eq!(overflow.total_duration_nanos, 105);
        assert_eq!(overflow.execution_count, 51);
        assert_eq!(overflow.total_rows, Some(10));
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let mut collector = QueryCollector::default();
        collector.merge_query("SQL", "select 1", 10, 1, Some(1));
        collector.merge_query("SQL", "select 1", 30, 2, Some(4));

        let result = collector.result();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].total_duration_nanos, 40);
        assert_eq!(result[0].execution_count, 3);
        assert_eq!(result[0].total_rows, Some(5));
    }

    #[test]
    fn test_types_are_bounded_independently() {
        let mut collector = QueryCollector::new(1);
        collector.merge_query("SQL", "A", 10, 1, None);
        collector.merge_query("SQL", "B", 5, 1, None);
        collector.merge_query("HTTP", "GET /x", 3, 1, None);

        let result = collector.result();
        // HTTP stays unbounded (1 entry), SQL folds one entry
        assert_eq!(result.len(), 3);
        assert!(result.iter().any(|e| e.query_type == "HTTP"));
        assert_eq!(
            result
                .iter()
                .filter(|e| e.query_text == OVERFLOW_BUCKET_KEY)
                .count(),
            1
        );
    }

    #[test]
    fn test_rows_stay_absent_when_never_reported() {
        let mut collector = QueryCollector::default();
        collector.merge_query("SQL", "select 1", 10, 1, None);
        collector.merge_query("SQL", "select 1", 10, 1, None);
        assert_eq!(collector.result()[0].total_rows, None);
    }
}
