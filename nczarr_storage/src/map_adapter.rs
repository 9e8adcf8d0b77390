//! Map adapters.
//!
//! A map adapter wraps a map and is itself a map.

pub mod performance_metrics;
