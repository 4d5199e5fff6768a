use std::future::Future;

use crate::error::CdcResult;
use crate::types::BufferedEvent;

/// Trait for the upstream feed supplying raw mutation and watermark events.
///
/// [`MutationFeed`] implementations wrap whatever client physically reads the
/// upstream store's change stream. The collector drives the feed through a
/// pull interface: one event per call, in stream order.
///
/// End of stream and transport failure are both terminal error returns
/// (conventionally [`crate::error::ErrorKind::StreamEnded`]); the collector
/// does not retry pulls, it surfaces the error to its caller.
pub trait MutationFeed {
    /// Pulls the next event from the feed.
    fn pull_event(&mut self) -> impl Future<Output = CdcResult<BufferedEvent>> + Send;
}
