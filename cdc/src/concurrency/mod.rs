//! Concurrency utilities for coordinating the CDC pipeline.
//!
//! The collect loop is single-threaded and cooperative; the only coordination
//! it needs is a graceful-shutdown signal that can interrupt its pull and emit
//! await points.

pub mod shutdown;
