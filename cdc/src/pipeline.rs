//! Pipeline orchestration: feed → collector → mounter → destination.
//!
//! The pipeline runs the collect loop on a spawned task with a sink that
//! mounts each raw transaction as it is emitted and pushes the result to the
//! destination. Mounting stays serialized with collection, which preserves the
//! strictly increasing commit-timestamp order end to end; a mount failure or a
//! destination rejection aborts the loop, with no skip and no retry.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::collector::{RawTransactionSink, TransactionCollector};
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::destination::Destination;
use crate::error::{CdcResult, ErrorKind};
use crate::mounter::TransactionMounter;
use crate::schema::SchemaVersionLookup;
use crate::source::MutationFeed;
use crate::types::RawTransaction;
use crate::{bail, cdc_error};

/// Unique identifier of a pipeline instance.
pub type PipelineId = u64;

/// Configuration for a pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Unique identifier for the pipeline.
    pub id: PipelineId,
}

/// Lifecycle state of a [`Pipeline`].
enum PipelineState<F, V> {
    /// Not started yet; holds the components the loop will consume.
    NotStarted {
        feed: F,
        mounter: TransactionMounter<V>,
    },
    /// Transient state while start is in progress.
    Starting,
    /// Running on a spawned task.
    Started { handle: JoinHandle<CdcResult<()>> },
    /// The loop was joined.
    Finished,
}

/// The collector sink used by the pipeline: mount, then write downstream.
struct MountingSink<V, D> {
    mounter: TransactionMounter<V>,
    destination: D,
}

impl<V, D> RawTransactionSink for MountingSink<V, D>
where
    V: SchemaVersionLookup + Send + Sync,
    D: Destination + Send + Sync,
{
    async fn emit(&mut self, transaction: RawTransaction) -> CdcResult<()> {
        let logical = self.mounter.mount(transaction).await?;
        self.destination.write_transaction(logical).await
    }
}

/// A CDC pipeline instance tying the core stages together.
///
/// Constructed once per stream, started once, torn down with
/// [`Pipeline::shutdown_and_wait`]. The schema registry inside the mounter is
/// advanced only by the pipeline's own loop, honoring its single-writer
/// contract.
pub struct Pipeline<F, V, D> {
    config: PipelineConfig,
    destination: D,
    state: PipelineState<F, V>,
    shutdown_tx: ShutdownTx,
}

impl<F, V, D> Pipeline<F, V, D>
where
    F: MutationFeed + Send + 'static,
    V: SchemaVersionLookup + Send + Sync + 'static,
    D: Destination + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline over a feed, a mounter, and a destination.
    pub fn new(
        config: PipelineConfig,
        feed: F,
        mounter: TransactionMounter<V>,
        destination: D,
    ) -> Self {
        // The receiver is not kept here; the loop subscribes through the
        // transmitter when it starts.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config,
            destination,
            state: PipelineState::NotStarted { feed, mounter },
            shutdown_tx,
        }
    }

    /// Returns the pipeline's identifier.
    pub fn id(&self) -> PipelineId {
        self.config.id
    }

    /// Returns a handle that can signal shutdown from outside the pipeline.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Spawns the collect loop.
    ///
    /// Fails with [`ErrorKind::InvalidState`] if the pipeline was already
    /// started.
    pub fn start(&mut self) -> CdcResult<()> {
        match std::mem::replace(&mut self.state, PipelineState::Starting) {
            PipelineState::NotStarted { feed, mounter } => {
                info!(pipeline_id = self.config.id, "starting pipeline");

                let sink = MountingSink {
                    mounter,
                    destination: self.destination.clone(),
                };
                let collector = TransactionCollector::new(feed, sink, self.shutdown_tx.subscribe());

                let handle = tokio::spawn(async move {
                    let result = collector.run().await;
                    if let Err(err) = &result {
                        error!(error = %err, "pipeline loop terminated with an error");
                    }

                    result
                });

                self.state = PipelineState::Started { handle };

                Ok(())
            }
            other => {
                self.state = other;
                bail!(
                    ErrorKind::InvalidState,
                    "Pipeline has already been started"
                );
            }
        }
    }

    /// Signals shutdown and waits for the loop to finish.
    pub async fn shutdown_and_wait(&mut self) -> CdcResult<()> {
        self.shutdown_tx.shutdown();
        self.wait().await
    }

    /// Waits for the loop to finish and returns its terminal result, after
    /// propagating shutdown to the destination.
    pub async fn wait(&mut self) -> CdcResult<()> {
        match std::mem::replace(&mut self.state, PipelineState::Finished) {
            PipelineState::Started { handle } => {
                let loop_result = match handle.await {
                    Ok(result) => result,
                    Err(err) => Err(cdc_error!(
                        ErrorKind::Unknown,
                        "Pipeline loop task panicked or was aborted",
                        err.to_string()
                    )),
                };

                if let Err(err) = self.destination.shutdown().await {
                    error!(error = %err, "destination shutdown failed");
                }

                info!(pipeline_id = self.config.id, "pipeline finished");

                loop_result
            }
            other => {
                self.state = other;
                bail!(ErrorKind::InvalidState, "Pipeline is not running");
            }
        }
    }
}
