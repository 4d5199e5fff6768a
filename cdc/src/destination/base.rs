use std::future::Future;

use crate::error::CdcResult;
use crate::types::LogicalTransaction;

/// Trait for systems that consume decoded transactions from the pipeline.
///
/// [`Destination`] implementations define how logical transactions are applied
/// to a target. Transactions arrive in strictly increasing commit-timestamp
/// order, each exactly once; within a transaction the DML sequence must be
/// applied in order, since the decoder's delete-before-insert pairing is what
/// keeps replay safe against uniqueness-constrained targets.
///
/// A rejected transaction aborts the pipeline loop; the core never retries on
/// the destination's behalf.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Propagates the shutdown signal to the destination.
    ///
    /// Override this method if the destination needs to perform cleanup or
    /// bookkeeping when the pipeline shuts down. The default implementation is
    /// a no-op.
    fn shutdown(&self) -> impl Future<Output = CdcResult<()>> + Send {
        async { Ok(()) }
    }

    /// Writes one decoded transaction to the destination.
    fn write_transaction(
        &self,
        transaction: LogicalTransaction,
    ) -> impl Future<Output = CdcResult<()>> + Send;
}
