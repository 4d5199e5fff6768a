//! Common types used throughout the CDC core.
//!
//! Re-exports the stream-level event types, the typed column values used by the
//! decode layer, and the logical transaction types handed to downstream sinks.

mod datum;
mod event;
mod transaction;

pub use datum::*;
pub use event::*;
pub use transaction::*;
