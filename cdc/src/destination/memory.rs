use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::destination::Destination;
use crate::error::CdcResult;
use crate::types::LogicalTransaction;

#[derive(Debug, Default)]
struct Inner {
    transactions: Vec<LogicalTransaction>,
    shutdown_called: bool,
}

/// In-memory destination for testing and development purposes.
///
/// [`MemoryDestination`] stores every transaction it receives, making it ideal
/// for inspecting pipeline output in tests. All data is held in memory and is
/// lost when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all transactions written to this destination.
    pub async fn transactions(&self) -> Vec<LogicalTransaction> {
        let inner = self.inner.lock().await;
        inner.transactions.clone()
    }

    /// Returns true if the pipeline propagated shutdown to this destination.
    pub async fn shutdown_called(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.shutdown_called
    }

    /// Clears all stored transactions.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.transactions.clear();
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn shutdown(&self) -> CdcResult<()> {
        let mut inner = self.inner.lock().await;
        inner.shutdown_called = true;

        Ok(())
    }

    async fn write_transaction(&self, transaction: LogicalTransaction) -> CdcResult<()> {
        let mut inner = self.inner.lock().await;

        info!(
            commit_ts = transaction.commit_ts,
            is_ddl = transaction.is_ddl(),
            "writing transaction"
        );

        inner.transactions.push(transaction);

        Ok(())
    }
}
