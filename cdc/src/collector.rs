//! Raw transaction collection.
//!
//! The upstream feed delivers mutations unordered and interleaved across
//! transactions; the only structure is the commit timestamp on each mutation
//! and the watermarks certifying that no further mutation can arrive at or
//! below a timestamp. The collector regroups that stream into complete
//! [`RawTransaction`]s and emits them in strictly increasing timestamp order,
//! each exactly once.

use std::collections::BTreeMap;
use std::future::Future;

use tracing::{debug, info};

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::CdcResult;
use crate::source::MutationFeed;
use crate::types::{BufferedEvent, RawMutation, RawTransaction, Watermark};

/// Trait for the stage consuming collected raw transactions.
///
/// An emit error aborts the collect loop immediately; a transaction is never
/// partially emitted or emitted twice.
pub trait RawTransactionSink {
    /// Pushes one complete raw transaction downstream.
    fn emit(&mut self, transaction: RawTransaction) -> impl Future<Output = CdcResult<()>> + Send;
}

/// Action to take after one step of the collect loop.
#[derive(Debug, Copy, Clone)]
enum CollectAction {
    /// Continue with the next event.
    Continue,
    /// Shutdown was observed; leave the loop without completing the cycle.
    Shutdown,
}

/// Groups the raw mutation stream into watermark-certified transactions.
///
/// The loop is strictly single-threaded and cooperative: one blocking pull,
/// then zero or more blocking emits, with the shutdown signal able to
/// interrupt both await points. A group that never receives a certifying
/// watermark is not emitted, even at stream end; completeness is defined by
/// watermark certification alone, because an uncertified group cannot be
/// proven complete.
pub struct TransactionCollector<F, S> {
    feed: F,
    sink: S,
    shutdown_rx: ShutdownRx,
    /// Mutations grouped by commit timestamp, awaiting certification.
    pending: BTreeMap<u64, Vec<RawMutation>>,
    /// The latest watermark observed, once any.
    watermark: Option<u64>,
}

impl<F, S> TransactionCollector<F, S>
where
    F: MutationFeed + Send,
    S: RawTransactionSink + Send,
{
    /// Creates a collector over the given feed and sink.
    pub fn new(feed: F, sink: S, shutdown_rx: ShutdownRx) -> Self {
        Self {
            feed,
            sink,
            shutdown_rx,
            pending: BTreeMap::new(),
            watermark: None,
        }
    }

    /// Returns the latest watermark observed, once any.
    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    /// Runs the collect loop until the feed fails, the sink rejects a
    /// transaction, or shutdown is signaled.
    ///
    /// Returns `Ok(())` only for shutdown; feed exhaustion surfaces as the
    /// feed's own terminal error.
    pub async fn run(mut self) -> CdcResult<()> {
        info!("starting transaction collector");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    info!("shutting down transaction collector");
                    return Ok(());
                }

                event = self.feed.pull_event() => {
                    match event? {
                        BufferedEvent::Mutation(mutation) => self.buffer_mutation(mutation),
                        BufferedEvent::Watermark(watermark) => {
                            if let CollectAction::Shutdown =
                                self.advance_watermark(watermark).await?
                            {
                                info!("shutting down transaction collector during emit");
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Buffers a mutation under its commit timestamp, preserving arrival
    /// order within the group.
    fn buffer_mutation(&mut self, mutation: RawMutation) {
        debug!(commit_ts = mutation.commit_ts, "buffering mutation");

        self.pending
            .entry(mutation.commit_ts)
            .or_default()
            .push(mutation);
    }

    /// Emits every pending group certified by `watermark`, in strictly
    /// ascending timestamp order.
    async fn advance_watermark(&mut self, watermark: Watermark) -> CdcResult<CollectAction> {
        while self
            .pending
            .first_key_value()
            .is_some_and(|(commit_ts, _)| *commit_ts <= watermark.timestamp)
        {
            let Some((commit_ts, mutations)) = self.pending.pop_first() else {
                break;
            };

            let transaction = RawTransaction {
                commit_ts,
                mutations,
            };

            debug!(
                commit_ts,
                mutations = transaction.mutations.len(),
                "emitting raw transaction"
            );

            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    return Ok(CollectAction::Shutdown);
                }

                result = self.sink.emit(transaction) => result?,
            }
        }

        debug!(watermark = watermark.timestamp, "watermark advanced");
        self.watermark = Some(watermark.timestamp);

        Ok(CollectAction::Continue)
    }
}
