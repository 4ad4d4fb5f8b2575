//! Bounded-cardinality aggregation of outbound service calls.
//!
//! Same overflow-bucket pattern as query aggregation, with one
//! difference: service calls compete for limit slots globally across
//! types, while each evicted entry still folds into its own type's
//! overflow bucket.

use crate::utils::config::{DEFAULT_SERVICE_CALL_LIMIT, OVERFLOW_BUCKET_KEY};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated totals for one (type, text) service-call key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCallEntry {
    pub call_type: String,
    pub call_text: String,
    pub total_duration_nanos: u64,
    pub execution_count: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ServiceCallAccum {
    total_duration_nanos: u64,
    execution_count: u64,
}

impl ServiceCallAccum {
    fn fold(&mut self, duration_nanos: u64, count: u64) {
        self.total_duration_nanos += duration_nanos;
        self.execution_count += count;
    }
}

/// Merges keyed service-call measurements with a hard cap on distinct
/// keys, enforced at read time.
#[derive(Debug, Clone)]
pub struct ServiceCallCollector {
    limit: usize,
    service_calls: HashMap<String, HashMap<String, ServiceCallAccum>>,
}

impl Default for ServiceCallCollector {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_CALL_LIMIT)
    }
}

impl ServiceCallCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            service_calls: HashMap::new(),
        }
    }

    /// Fold one measurement into the accumulator.
    pub fn merge_service_call(
        &mut self,
        call_type: &str,
        call_text: &str,
        total_duration_nanos: u64,
        execution_count: u64,
    ) {
        self.service_calls
            .entry(call_type.to_string())
            .or_default()
            .entry(call_text.to_string())
            .or_default()
            .fold(total_duration_nanos, execution_count);
    }

    /// Number of distinct keys currently accumulated (all types).
    pub fn entry_count(&self) -> usize {
        self.service_calls.values().map(HashMap::len).sum()
    }

    /// Sorted, cardinality-bounded snapshot.
    ///
    /// All entries sort together descending by total duration; the top
    /// `limit` stay and the tail folds into per-type overflow entries.
    /// The final list is re-sorted after folding.
    pub fn result(&self) -> Vec<ServiceCallEntry> {
        // Explicit overflow entries never compete for limit slots
        let mut overflow: HashMap<&String, (ServiceCallAccum, bool)> = HashMap::new();
        let mut sortable: Vec<(&String, &String, &ServiceCallAccum)> = Vec::new();
        for (call_type, entries) in &self.service_calls {
            for (text, accum) in entries {
                if text == OVERFLOW_BUCKET_KEY {
                    overflow.insert(call_type, (*accum, true));
                } else {
                    sortable.push((call_type, text, accum));
                }
            }
        }

        sortable.sort_by(|a, b| {
            b.2.total_duration_nanos
                .cmp(&a.2.total_duration_nanos)
                .then_with(|| (a.0, a.1).cmp(&(b.0, b.1)))
        });

        if sortable.len() > self.limit {
            debug!(
                "folding {} service-call entries into overflow buckets",
                sortable.len() - self.limit
            );
        }
        for &(call_type, _, accum) in sortable.iter().skip(self.limit) {
            let slot = overflow
                .entry(call_type)
                .or_insert((ServiceCallAccum::default(), false));
            slot.0
                .fold(accum.total_duration_nanos, accum.execution_count);
            slot.1 = true;
        }
        sortable.truncate(self.limit);

        let mut bounded: Vec<ServiceCallEntry> = sortable
            .into_iter()
            .map(|(call_type, text, accum)| ServiceCallEntry {
                call_type: call_type.clone(),
                call_text: text.clone(),
                total_duration_nanos: accum.total_duration_nanos,
                execution_count: accum.execution_count,
            })
            .collect();
        for (call_type, (accum, present)) in overflow {
            if present {
                bounded.push(ServiceCallEntry {
                    call_type: call_type.clone(),
                    call_text: OVERFLOW_BUCKET_KEY.to_string(),
                    total_duration_nanos: accum.total_duration_nanos,
                    execution_count: accum.execution_count,
                });
            }
        }

        bounded.sort_by(|a, b| {
            b.total_duration_nanos
                .cmp(&a.total_duration_nanos)
                .then_with(|| (&a.call_type, &a.call_text).cmp(&(&b.call_type, &b.call_text)))
        });
        bounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_folding_for_single_type() {
        let mut collector = ServiceCallCollector::new(2);
        collector.merge_service_call("HTTP", "A", 10, 1);
        collector.merge_service_call("HTTP", "B", 5, 1);
        collector.merge_service_call("HTTP", "C", 20, 1);
        collector.merge_service_call("HTTP", "D", 1, 1);

        let result = collector.result();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].call_text, "C");
        assert_eq!(result[1].call_text, "A");
        assert_eq!(result[2].call_text, OVERFLOW_BUCKET_KEY);
        assert_eq!(result[2].total_duration_nanos, 6);
    }

    #[test]
    fn test_limit_applies_globally_across_types() {
        let mut collector = ServiceCallCollector::new(2);
        collector.merge_service_call("HTTP", "slow", 100, 1);
        collector.merge_service_call("GRPC", "medium", 50, 1);
        collector.merge_service_call("HTTP", "fast", 10, 1);

        let result = collector.result();
        // Two kept entries plus one HTTP overflow holding "fast"
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].call_text, "slow");
        assert_eq!(result[1].call_text, "medium");
        assert_eq!(result[2].call_type, "HTTP");
        assert_eq!(result[2].call_text, OVERFLOW_BUCKET_KEY);
        assert_eq!(result[2].total_duration_nanos, 10);
    }

    #[test]
    fn test_explicit_overflow_totals_are_added_to() {
        let mut collector = ServiceCallCollector::new(1);
        collector.merge_service_call("HTTP", OVERFLOW_BUCKET_KEY, 40, 4);
        collector.merge_service_call("HTTP", "A", 10, 1);
        collector.merge_service_call("HTTP", "B", 5, 1);

        let result = collector.result();
        assert_eq!(result.len(), 2);
        // Pre-reported overflow (40) plus evicted B (5)
        assert_eq!(result[0].call_text, OVERFLOW_BUCKET_KEY);
        assert_eq!(result[0].total_duration_nanos, 45);
        assert_eq!(result[0].execution_count, 5);
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let mut collector = ServiceCallCollector::default();
        collector.merge_service_call("HTTP", "GET /users", 10, 1);
        collector.merge_service_call("HTTP", "GET /users", 15, 2);

        let result = collector.result();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].total_duration_nanos, 25);
        assert_eq!(result[0].execution_count, 3);
    }
}
