//! Error types for the entire crate.
//!
//! We use `thiserror` for library-style errors with custom types.
//! Aggregation itself has no recoverable-error cases; errors only arise
//! at the wire boundary where externally-encoded data enters or leaves.

use thiserror::Error;

/// Errors that can occur encoding or decoding wire-format data
#[derive(Error, Debug)]
pub enum WireError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid wire structure: {0}")]
    InvalidFormat(String),

    #[error("name index {0} out of range for the encoded name table")]
    NameIndexOutOfRange(u32),

    #[error("histogram payload could not be encoded: {0}")]
    HistogramEncode(String),

    #[error("histogram payload could not be decoded: {0}")]
    HistogramDecode(String),
}
