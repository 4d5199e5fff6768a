pub mod codec;
pub mod collector;
pub mod concurrency;
pub mod destination;
pub mod error;
mod macros;
pub mod mounter;
pub mod pipeline;
pub mod schema;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
