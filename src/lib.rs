//! Trace Rollup
//!
//! In-memory trace and profile aggregation engine for an
//! application-performance-monitoring agent.
//!
//! This crate is the data-reduction layer of the agent: it continuously
//! merges raw per-transaction measurements (stack-trace samples, query
//! executions, service calls, error occurrences, duration samples)
//! captured by many concurrent transactions into bounded, queryable
//! rollup structures.
//!
//! It does not capture data, persist data, or decide what to sample -
//! it only merges, bounds, filters, and summarizes what the
//! instrumentation layer hands to it. No operation blocks, suspends, or
//! performs I/O.

pub mod collectors;
pub mod histogram;
pub mod intern;
pub mod profile;
pub mod rollup;
pub mod utils;
pub mod wire;
