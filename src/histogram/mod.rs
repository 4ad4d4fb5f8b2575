//! Duration histogram with transparent exact-to-approximate conversion.
//!
//! Small aggregations keep every raw value and answer percentile queries
//! exactly. Once a histogram outgrows the configured ceiling it converts
//! to a compressed hdrhistogram and stays approximate for the rest of its
//! life - the conversion is a one-way state transition, never reversed,
//! and merging with an approximate histogram makes the result approximate.

use crate::utils::config::{HISTOGRAM_EXACT_CEILING, HISTOGRAM_SIGFIGS};
use crate::utils::error::WireError;
use hdrhistogram::serialization::{Deserializer, Serializer, V2DeflateSerializer};
use hdrhistogram::Histogram;
use log::debug;
use serde::{Deserialize, Serialize};

/// The two mutually exclusive storage modes.
///
/// **Private** - the mode is an implementation detail; callers observe it
/// only through `is_approximate` and the wire form.
#[derive(Clone)]
enum HistogramData {
    /// Raw values, sorted lazily once per batch of adds
    Exact { values: Vec<u64>, sorted: bool },

    /// Compressed log-bucketed structure
    Approximate(Histogram<u64>),
}

impl std::fmt::Debug for HistogramData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistogramData::Exact { values, .. } => {
                f.debug_struct("Exact").field("len", &values.len()).finish()
            }
            HistogramData::Approximate(hist) => f
                .debug_struct("Approximate")
                .field("len", &hist.len())
                .finish(),
        }
    }
}

/// Accumulates non-negative integer duration samples and answers
/// percentile queries.
///
/// **Public** - one instance per aggregation bucket.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    data: HistogramData,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire form: exact mode carries the ordered raw values, approximate mode
/// an opaque compressed payload. Either form deserializes into a
/// histogram that can be merged further.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HistogramWire {
    Exact { values: Vec<u64> },
    Approximate { payload: Vec<u8> },
}

fn new_backing_histogram() -> Histogram<u64> {
    // Auto-resizing, so later merges never fail on range
    Histogram::new(HISTOGRAM_SIGFIGS).expect("sigfigs constant is in 1..=5")
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            data: HistogramData::Exact {
                values: Vec::new(),
                sorted: true,
            },
        }
    }

    /// Record a single duration sample.
    ///
    /// Converts to approximate mode first if the exact store is full.
    pub fn add(&mut self, value: u64) {
        if let HistogramData::Exact { values, sorted } = &mut self.data {
            if values.len() < HISTOGRAM_EXACT_CEILING {
                values.push(value);
                *sorted = false;
                return;
            }
        }
        self.promote();
        if let HistogramData::Approximate(hist) = &mut self.data {
            hist.saturating_record(value);
        }
    }

    /// Merge another histogram into this one.
    ///
    /// Both sides exact: the incoming raw values replay through `add`
    /// (which may itself trip the conversion). Either side approximate:
    /// the receiver promotes first, then merges structurally.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        match &other.data {
            HistogramData::Exact { values, .. } => {
                for &value in values {
                    self.add(value);
                }
            }
            HistogramData::Approximate(theirs) => {
                self.promote();
                if let HistogramData::Approximate(ours) = &mut self.data {
                    ours.add(theirs).expect("receiver histogram is auto-resizing");
                }
            }
        }
    }

    /// Value at the given percentile, by ascending-order ceiling-rank
    /// selection (no interpolation).
    ///
    /// Percentile 0 returns the minimum recorded value, or 0 if empty.
    /// Exact mode sorts lazily once per batch of adds.
    pub fn value_at_percentile(&mut self, percentile: f64) -> u64 {
        match &mut self.data {
            HistogramData::Exact { values, sorted } => {
                if values.is_empty() {
                    return 0;
                }
                if !*sorted {
                    values.sort_unstable();
                    *sorted = true;
                }
                if percentile <= 0.0 {
                    return values[0];
                }
                let n = values.len();
                let rank = (n as f64 * percentile / 100.0).ceil() as usize;
                values[rank.clamp(1, n) - 1]
            }
            HistogramData::Approximate(hist) => {
                // Pin the endpoints to the tracked min/max so the
                // percentile-0/100 invariants hold exactly in both modes
                if percentile <= 0.0 {
                    hist.min()
                } else if percentile >= 100.0 {
                    hist.max()
                } else {
                    hist.value_at_percentile(percentile)
                }
            }
        }
    }

    /// Total number of recorded samples.
    pub fn count(&self) -> u64 {
        match &self.data {
            HistogramData::Exact { values, .. } => values.len() as u64,
            HistogramData::Approximate(hist) => hist.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Minimum recorded value (0 if empty).
    pub fn min(&self) -> u64 {
        match &self.data {
            HistogramData::Exact { values, .. } => values.iter().min().copied().unwrap_or(0),
            HistogramData::Approximate(hist) => hist.min(),
        }
    }

    /// Maximum recorded value (0 if empty).
    pub fn max(&self) -> u64 {
        match &self.data {
            HistogramData::Exact { values, .. } => values.iter().max().copied().unwrap_or(0),
            HistogramData::Approximate(hist) => hist.max(),
        }
    }

    /// Mean of recorded values (0.0 if empty).
    pub fn mean(&self) -> f64 {
        match &self.data {
            HistogramData::Exact { values, .. } => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<u64>() as f64 / values.len() as f64
                }
            }
            HistogramData::Approximate(hist) => hist.mean(),
        }
    }

    /// Whether the one-way conversion has happened.
    pub fn is_approximate(&self) -> bool {
        matches!(self.data, HistogramData::Approximate(_))
    }

    /// One-way exact-to-approximate conversion. No-op once approximate.
    fn promote(&mut self) {
        if let HistogramData::Exact { values, .. } = &self.data {
            debug!(
                "converting histogram to approximate mode at {} samples",
                values.len()
            );
            let mut hist = new_backing_histogram();
            for &value in values {
                hist.saturating_record(value);
            }
            self.data = HistogramData::Approximate(hist);
        }
    }

    /// Encode to the wire form.
    pub fn to_wire(&self) -> Result<HistogramWire, WireError> {
        match &self.data {
            HistogramData::Exact { values, .. } => {
                let mut values = values.clone();
                values.sort_unstable();
                Ok(HistogramWire::Exact { values })
            }
            HistogramData::Approximate(hist) => {
                let mut payload = Vec::new();
                V2DeflateSerializer::new()
                    .serialize(hist, &mut payload)
                    .map_err(|e| WireError::HistogramEncode(e.to_string()))?;
                Ok(HistogramWire::Approximate { payload })
            }
        }
    }

    /// Decode from the wire form.
    pub fn from_wire(wire: &HistogramWire) -> Result<Self, WireError> {
        match wire {
            HistogramWire::Exact { values } => {
                let mut histogram = Self::new();
                for &value in values {
                    histogram.add(value);
                }
                Ok(histogram)
            }
            HistogramWire::Approximate { payload } => {
                let mut cursor = std::io::Cursor::new(payload.as_slice());
                let mut hist: Histogram<u64> = Deserializer::new()
                    .deserialize(&mut cursor)
                    .map_err(|e| WireError::HistogramDecode(e.to_string()))?;
                // Decoded histograms must stay mergeable
                hist.auto(true);
                Ok(Self {
                    data: HistogramData::Approximate(hist),
                })
            }
        }
    }
}
