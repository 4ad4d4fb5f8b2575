//! Merging of chronologically-ordered error intervals.
//!
//! Consecutive intervals sharing an error message collapse into single
//! spans. Callers can veto merging across either boundary of an interval
//! and can signal gaps in the underlying data, which always break a
//! merge chain.

use serde::{Deserialize, Serialize};

/// A contiguous `[from, to)` span of error occurrences with one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInterval {
    /// Span start, epoch millis (inclusive)
    pub from: i64,

    /// Span end, epoch millis (exclusive)
    pub to: i64,

    pub message: String,
    pub count: u64,

    /// Veto merging with the logically-preceding interval
    #[serde(default)]
    pub do_not_merge_left: bool,

    /// Veto merging with the logically-following interval
    #[serde(default)]
    pub do_not_merge_right: bool,
}

/// State machine over a single current-interval accumulator.
///
/// Intervals are supplied in non-decreasing time order and are never
/// reordered.
#[derive(Debug, Clone, Default)]
pub struct ErrorIntervalCollector {
    merged: Vec<ErrorInterval>,

    /// OPEN when Some, CLOSED when None
    current: Option<ErrorInterval>,
}

impl ErrorIntervalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of chronologically-ordered intervals into the
    /// accumulator.
    pub fn add_error_intervals(&mut self, intervals: &[ErrorInterval]) {
        for interval in intervals {
            self.add_one(interval);
        }
    }

    fn add_one(&mut self, incoming: &ErrorInterval) {
        let mergeable = match &self.current {
            Some(current) => {
                current.message == incoming.message && !incoming.do_not_merge_left
            }
            None => false,
        };

        if mergeable {
            if let Some(current) = &mut self.current {
                current.to = incoming.to;
                current.count += incoming.count;
                // The incoming interval is now the right edge
                current.do_not_merge_right = incoming.do_not_merge_right;
            }
        } else {
            self.close();
            self.current = Some(incoming.clone());
        }

        if incoming.do_not_merge_right {
            self.close();
        }
    }

    /// Signal a gap in the underlying data. A gap always breaks merging,
    /// regardless of messages or flags.
    pub fn add_gap(&mut self) {
        self.close();
    }

    /// The merged intervals so far. An open interval is emitted as a
    /// copy without mutating collector state, so accumulation can
    /// continue afterwards.
    pub fn merged_intervals(&self) -> Vec<ErrorInterval> {
        let mut out = self.merged.clone();
        if let Some(current) = &self.current {
            out.push(current.clone());
        }
        out
    }

    fn close(&mut self) {
        if let Some(current) = self.current.take() {
            self.merged.push(current);
        }
    }
}
